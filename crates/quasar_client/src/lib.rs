//! Quasar chat client library (config, HTTP API, conversation and citation state).
//! Used by the `quasar` terminal front-end.

pub mod citations;
pub mod client;
pub mod config;
pub mod conversation;
pub mod messages;
pub mod session;

pub use citations::{CitationPanel, NO_SOURCES};
pub use client::{ApiClient, ClientError};
pub use config::{default_config_path, ApiSection, Config, ConfigError, UiSection};
pub use conversation::{Body, Conversation, Message, MessageId, Sender};
pub use messages::{ChatResponse, HealthStatus, Page, Source};
pub use session::{
    ChatSession, ChatView, Completion, InputEvent, Key, PendingExchange, Sequence, ERROR_REPLY,
    GREETING, THINKING,
};
