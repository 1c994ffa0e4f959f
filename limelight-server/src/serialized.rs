//! All schemas that are exposed from endpoints are defined here
//! along with the conversion impls

use limelight_core::{ActiveStream, ChatMessage, Peer, StreamKind};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntry {
    room_id: String,
    streamer_name: String,
    title: String,
    #[schema(value_type = String)]
    stream_type: StreamKind,
    price: Option<i32>,
    is_active: bool,
    created_at: String,
    ended_at: Option<String>,
    /// Connections watching right now, 0 when the room has no live presence.
    viewer_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerEntry {
    id: u64,
    name: String,
    is_streamer: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    id: String,
    author: String,
    text: String,
    timestamp: String,
    is_owner: bool,
    is_gift: bool,
    gift_type: Option<String>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<StreamEntry> for ActiveStream {
    fn to_serialized(&self) -> StreamEntry {
        StreamEntry {
            room_id: self.data.room_id.clone(),
            streamer_name: self.data.streamer_name.clone(),
            title: self.data.title.clone(),
            stream_type: self.data.kind,
            price: self.data.price,
            is_active: self.data.is_active,
            created_at: self.data.created_at.to_rfc3339(),
            ended_at: self.data.ended_at.map(|t| t.to_rfc3339()),
            viewer_count: self.viewer_count,
        }
    }
}

impl ToSerialized<PeerEntry> for Peer {
    fn to_serialized(&self) -> PeerEntry {
        PeerEntry {
            id: self.id.value(),
            name: self.name.clone(),
            is_streamer: self.is_streamer,
        }
    }
}

impl ToSerialized<ChatEvent> for ChatMessage {
    fn to_serialized(&self) -> ChatEvent {
        ChatEvent {
            id: self.id.clone(),
            author: self.author.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp.to_rfc3339(),
            is_owner: self.is_owner,
            is_gift: self.is_gift,
            gift_type: self.gift_type.clone(),
        }
    }
}
