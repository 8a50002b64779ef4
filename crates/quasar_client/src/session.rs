//! Chat session: turns user input into exchanges and reflects each exchange
//! into the message log and the citation panel.
//!
//! An exchange is split into [`ChatSession::begin`] (synchronous UI updates,
//! returns a [`PendingExchange`]) and [`ChatSession::complete`] (applies the
//! API result). [`ChatSession::submit`] runs both around one request; a
//! front-end that keeps several requests in flight calls the halves itself.

use crate::citations::CitationPanel;
use crate::client::{ApiClient, ClientError};
use crate::conversation::{Body, Conversation, Message, MessageId};
use crate::messages::ChatResponse;

pub const GREETING: &str = "Hello! I am Quasar. How can I help you with your documents today?";
pub const THINKING: &str = "Quasar is thinking...";
pub const ERROR_REPLY: &str = "Sorry, I encountered an error.";

/// Display surface of a session. Called after the model has changed.
pub trait ChatView {
    fn message_appended(&mut self, id: MessageId, message: &Message);
    fn message_replaced(&mut self, id: MessageId, message: &Message);
    fn citations_replaced(&mut self, panel: &CitationPanel);
}

/// Headless sessions.
impl ChatView for () {
    fn message_appended(&mut self, _: MessageId, _: &Message) {}
    fn message_replaced(&mut self, _: MessageId, _: &Message) {}
    fn citations_replaced(&mut self, _: &CitationPanel) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

/// User interaction on the input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The explicit send control.
    Submit,
    KeyPress(Key),
}

impl InputEvent {
    pub fn triggers_submit(self) -> bool {
        matches!(self, InputEvent::Submit | InputEvent::KeyPress(Key::Enter))
    }
}

/// Monotonic exchange number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(u64);

impl Sequence {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// An exchange whose request has been (or is about to be) sent. Consumed by
/// [`ChatSession::complete`]; not clonable, so its placeholder resolves once.
#[derive(Debug)]
pub struct PendingExchange {
    sequence: Sequence,
    placeholder: MessageId,
    question: String,
}

impl PendingExchange {
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

/// How an exchange ended. `current` is false when a newer exchange was
/// submitted meanwhile; such an answer still fills its own placeholder but
/// leaves the citation panel alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Answered { current: bool },
    Failed { current: bool },
}

pub struct ChatSession<V> {
    view: V,
    conversation: Conversation,
    citations: CitationPanel,
    next_sequence: u64,
    latest: Option<Sequence>,
}

impl<V: ChatView> ChatSession<V> {
    /// Bind a session to its view and show the greeting, if any.
    pub fn setup(view: V, greeting: Option<&str>) -> Self {
        let mut session = Self {
            view,
            conversation: Conversation::new(),
            citations: CitationPanel::Cleared,
            next_sequence: 0,
            latest: None,
        };
        if let Some(text) = greeting.filter(|g| !g.is_empty()) {
            session.append(Message::assistant(Body::Plain(text.to_string())));
        }
        session
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn citations(&self) -> &CitationPanel {
        &self.citations
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Dispatch an input event; only the send control and Enter submit.
    pub fn handle_input(&mut self, event: InputEvent, input: &str) -> Option<PendingExchange> {
        if !event.triggers_submit() {
            return None;
        }
        self.begin(input)
    }

    /// Start an exchange: user message, cleared panel, placeholder.
    /// Blank input is ignored and returns `None`.
    pub fn begin(&mut self, input: &str) -> Option<PendingExchange> {
        let question = input.trim();
        if question.is_empty() {
            return None;
        }

        self.append(Message::user(question));
        self.replace_citations(CitationPanel::Cleared);
        let placeholder = self.append(Message::placeholder(THINKING));

        let sequence = Sequence(self.next_sequence);
        self.next_sequence += 1;
        self.latest = Some(sequence);
        tracing::debug!(sequence = sequence.0, "exchange started");

        Some(PendingExchange {
            sequence,
            placeholder,
            question: question.to_string(),
        })
    }

    /// Finish an exchange with the API result.
    pub fn complete(
        &mut self,
        pending: PendingExchange,
        result: Result<ChatResponse, ClientError>,
    ) -> Completion {
        let current = self.latest == Some(pending.sequence);
        match result {
            Ok(response) => {
                self.resolve(pending.placeholder, Body::Markup(response.answer));
                if current {
                    self.replace_citations(CitationPanel::from_sources(response.sources));
                } else {
                    tracing::debug!(
                        sequence = pending.sequence.0,
                        "newer exchange in flight, dropping citations"
                    );
                }
                Completion::Answered { current }
            }
            Err(err) => {
                tracing::error!(sequence = pending.sequence.0, error = %err, "error fetching from API");
                self.resolve(pending.placeholder, Body::Plain(ERROR_REPLY.to_string()));
                Completion::Failed { current }
            }
        }
    }

    /// One full exchange against `api`. `None` when the input was blank.
    pub async fn submit(&mut self, api: &ApiClient, input: &str) -> Option<Completion> {
        let pending = self.begin(input)?;
        let result = api.ask(pending.question()).await;
        Some(self.complete(pending, result))
    }

    fn append(&mut self, message: Message) -> MessageId {
        let id = self.conversation.push(message);
        self.view.message_appended(id, &self.conversation[id]);
        id
    }

    fn resolve(&mut self, id: MessageId, body: Body) {
        match self.conversation.resolve(id, body) {
            Some(message) => self.view.message_replaced(id, message),
            None => tracing::warn!(message_index = id.index(), "placeholder already resolved"),
        }
    }

    fn replace_citations(&mut self, panel: CitationPanel) {
        self.citations = panel;
        self.view.citations_replaced(&self.citations);
    }
}
