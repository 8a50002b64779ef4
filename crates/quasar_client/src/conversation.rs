//! The visible conversation: an append-only message log.

use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

/// Message content. `Markup` is server-supplied and rendered as-is by
/// front-ends that understand markup; it is never escaped here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Plain(String),
    Markup(String),
}

impl Body {
    pub fn as_str(&self) -> &str {
        match self {
            Body::Plain(s) | Body::Markup(s) => s,
        }
    }

    pub fn is_markup(&self) -> bool {
        matches!(self, Body::Markup(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub body: Body,
    pending: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            body: Body::Plain(text.into()),
            pending: false,
        }
    }

    pub fn assistant(body: Body) -> Self {
        Self {
            sender: Sender::Assistant,
            body,
            pending: false,
        }
    }

    /// Assistant message awaiting its answer; the only kind that may be replaced.
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            body: Body::Plain(text.into()),
            pending: true,
        }
    }

    pub fn content(&self) -> &str {
        self.body.as_str()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Position of a message in its conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(usize);

impl MessageId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> MessageId {
        self.messages.push(message);
        MessageId(self.messages.len() - 1)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(id.0)
    }

    /// Replace a placeholder's body. Returns `None` (and changes nothing) if
    /// `id` is not a pending placeholder, so each placeholder resolves once.
    pub fn resolve(&mut self, id: MessageId, body: Body) -> Option<&Message> {
        let message = self.messages.get_mut(id.0).filter(|m| m.pending)?;
        message.body = body;
        message.pending = false;
        Some(&*message)
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.pending).count()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Index<MessageId> for Conversation {
    type Output = Message;

    fn index(&self, id: MessageId) -> &Message {
        &self.messages[id.0]
    }
}
