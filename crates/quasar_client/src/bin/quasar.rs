//! quasar: terminal front-end for the Quasar document Q&A API.
//! With a QUESTION argument it runs one exchange and exits; otherwise every
//! stdin line is sent as a question until EOF. Conversation goes to stdout,
//! logs to stderr.

use clap::Parser;
use futures_util::stream::{FuturesUnordered, StreamExt};
use quasar_client::{
    config, ApiClient, CitationPanel, ChatSession, ChatView, Completion, Config, InputEvent, Key,
    Message, MessageId, Sender, GREETING,
};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "quasar", version, about = "Ask the Quasar API about your documents")]
struct Cli {
    /// Config file (default: ~/.quasar/config.yaml)
    #[arg(long, env = "QUASAR_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides api.base_url from the config file
    #[arg(long)]
    base_url: Option<String>,
    /// Ask this question and exit instead of reading stdin
    question: Option<String>,
}

/// Prints the conversation as it changes.
struct TerminalView<W> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    fn new(out: W) -> Self {
        Self { out }
    }

    fn print_message(&mut self, message: &Message) {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Assistant => "quasar",
        };
        let _ = writeln!(self.out, "{}> {}", who, message.content());
        let _ = self.out.flush();
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn message_appended(&mut self, _: MessageId, message: &Message) {
        self.print_message(message);
    }

    fn message_replaced(&mut self, _: MessageId, message: &Message) {
        self.print_message(message);
    }

    fn citations_replaced(&mut self, panel: &CitationPanel) {
        // A cleared panel has nothing new to show in a scrolling transcript.
        if *panel == CitationPanel::Cleared {
            return;
        }
        let _ = writeln!(self.out, "Sources:");
        for line in panel.lines() {
            let _ = writeln!(self.out, "  {}", line);
        }
        let _ = self.out.flush();
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => config::load(path)?,
        None => match config::default_config_path() {
            Some(path) => config::load_or_default(&path)?,
            None => Config::default(),
        },
    };
    if let Some(url) = &cli.base_url {
        cfg.api.base_url = Some(url.clone());
    }
    Ok(cfg)
}

async fn run_once(api: &ApiClient, question: &str) -> ExitCode {
    let view = TerminalView::new(std::io::stdout());
    let mut session = ChatSession::setup(view, None);
    match session.submit(api, question).await {
        Some(Completion::Answered { .. }) => ExitCode::SUCCESS,
        Some(Completion::Failed { .. }) => ExitCode::FAILURE,
        None => {
            error!("no question provided");
            ExitCode::FAILURE
        }
    }
}

async fn run_interactive(api: ApiClient, greeting: Option<&str>) -> ExitCode {
    // Logs only; runs alongside the chat loop.
    let probe = api.clone();
    tokio::spawn(async move {
        match probe.health().await {
            Ok(status) if status.is_ok() => info!(detail = ?status.message, "API is up"),
            Ok(status) => warn!(status = %status.status, "API reports unexpected status"),
            Err(e) => warn!(error = %e, "API health check failed"),
        }
    });

    let view = TerminalView::new(std::io::stdout());
    let mut session = ChatSession::setup(view, greeting);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let mut in_flight = FuturesUnordered::new();

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    if let Some(pending) = session.handle_input(InputEvent::KeyPress(Key::Enter), &line) {
                        let api = api.clone();
                        in_flight.push(async move {
                            let result = api.ask(pending.question()).await;
                            (pending, result)
                        });
                    }
                }
                Ok(None) => {
                    debug!(in_flight = in_flight.len(), "stdin closed");
                    input_open = false;
                }
                Err(e) => {
                    error!(error = %e, "failed to read stdin");
                    input_open = false;
                }
            },
            Some((pending, result)) = in_flight.next(), if !in_flight.is_empty() => {
                session.complete(pending, result);
            }
            else => break,
        }
    }
    ExitCode::SUCCESS
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let api = match ApiClient::new(&cfg.api) {
        Ok(api) => api,
        Err(e) => {
            error!(error = %e, "failed to create API client");
            return ExitCode::FAILURE;
        }
    };
    debug!(url = %api.chat_url(), "using chat endpoint");

    match cli.question.as_deref() {
        Some(question) => run_once(&api, question).await,
        None => {
            let greeting = cfg.ui.greeting.as_deref().unwrap_or(GREETING);
            run_interactive(api, Some(greeting)).await
        }
    }
}
