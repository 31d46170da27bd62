//! The per-session conversation log.

use crate::state::{ChatMessage, ChatRole};
use serde::Serialize;

/// One rendered transcript entry, ready for a chat widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bubble {
    pub role: ChatRole,
    pub label: &'static str,
    pub avatar: &'static str,
    pub content: String,
}

impl From<&ChatMessage> for Bubble {
    fn from(message: &ChatMessage) -> Self {
        let role = message.role();
        Self {
            role,
            label: role.label(),
            avatar: role.avatar(),
            content: message.content().to_string(),
        }
    }
}

/// Append-only, insertion-ordered log of chat messages for one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One bubble per stored message, in display order. Does not mutate.
    pub fn render(&self) -> Vec<Bubble> {
        self.messages.iter().map(Bubble::from).collect()
    }
}
