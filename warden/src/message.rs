//! Inbound command messages.
//!
//! A [`CommandMessage`] is the platform-agnostic view of one chat message
//! the dispatcher and the argument scanners operate on. The adapter that
//! produces these from a concrete chat platform lives outside this crate.

use crate::util::generate_message_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound message addressed to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Unique message id.
    pub id: String,
    /// Organization (guild/server) the message originated from.
    pub org_id: u64,
    /// Channel the message was posted in.
    pub channel_id: u64,
    /// Sender's id within the platform.
    pub sender_id: u64,
    /// Raw text content.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
}

impl CommandMessage {
    /// Create a new message with the given routing ids and content.
    pub fn new(org_id: u64, channel_id: u64, sender_id: u64, content: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            org_id,
            channel_id,
            sender_id,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// A minimal message for tests and local tooling.
    pub fn local(content: impl Into<String>) -> Self {
        Self::new(0, 0, 0, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = CommandMessage::new(1, 2, 3, "!remind in 3h tea");
        assert_eq!(msg.org_id, 1);
        assert_eq!(msg.channel_id, 2);
        assert_eq!(msg.sender_id, 3);
        assert!(msg.id.starts_with("msg-"));
    }
}
