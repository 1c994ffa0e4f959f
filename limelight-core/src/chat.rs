use chrono::{DateTime, Utc};

use crate::util::random_string;

const MESSAGE_ID_LENGTH: usize = 16;

/// A canonical chat event, as delivered to every member of a room.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub text: String,
    /// Stamped by the coordinator. Client-supplied timestamps are ignored.
    pub timestamp: DateTime<Utc>,
    pub is_owner: bool,
    pub is_gift: bool,
    pub gift_type: Option<String>,
}

/// A raw chat message as supplied by a client.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub author: String,
    pub text: String,
    pub is_owner: bool,
    pub is_gift: bool,
    pub gift_type: Option<String>,
}

impl ChatMessage {
    /// Canonicalizes a raw message, assigning its id and timestamp.
    pub fn canonicalize(raw: NewChatMessage) -> Self {
        Self {
            id: random_string(MESSAGE_ID_LENGTH),
            timestamp: Utc::now(),
            author: raw.author,
            text: raw.text,
            is_owner: raw.is_owner,
            is_gift: raw.is_gift,
            gift_type: raw.gift_type,
        }
    }
}
