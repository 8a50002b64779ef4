//! Citation panel: the sources behind the latest answer, and nothing older.

use crate::messages::Source;

pub const NO_SOURCES: &str = "No sources were used for this answer.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CitationPanel {
    /// Reset at submission; stays this way if the exchange fails.
    #[default]
    Cleared,
    /// The answer arrived without sources.
    NoSources,
    Listed(Vec<Source>),
}

impl CitationPanel {
    /// Panel for a completed answer. Always a full replacement.
    pub fn from_sources(sources: Vec<Source>) -> Self {
        if sources.is_empty() {
            CitationPanel::NoSources
        } else {
            CitationPanel::Listed(sources)
        }
    }

    pub fn sources(&self) -> &[Source] {
        match self {
            CitationPanel::Listed(sources) => sources,
            CitationPanel::Cleared | CitationPanel::NoSources => &[],
        }
    }

    /// Display lines: the numbered list, or the fixed "no sources" text.
    pub fn lines(&self) -> Vec<String> {
        match self {
            CitationPanel::Listed(sources) => sources
                .iter()
                .enumerate()
                .map(|(i, source)| entry_line(i + 1, source))
                .collect(),
            CitationPanel::Cleared | CitationPanel::NoSources => vec![NO_SOURCES.to_string()],
        }
    }
}

/// `"{index}. {source} (Page: {page})"`, with `index` starting at 1.
pub fn entry_line(index: usize, source: &Source) -> String {
    format!("{}. {} (Page: {})", index, source.source, source.page_label())
}
