use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::{chat::ChatMessage, rooms::Peer, ConnectionId};

/// Events delivered to individual connections.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The initial peer set, sent once to a connection that joined a room.
    PeersInRoom { peers: Vec<Peer> },
    /// A new peer joined a room this connection is in.
    PeerJoined {
        peer_id: ConnectionId,
        name: String,
        is_streamer: bool,
    },
    /// A peer left a room this connection is in.
    PeerLeft {
        peer_id: ConnectionId,
        is_streamer: bool,
    },
    /// A negotiation payload relayed from another connection.
    /// Opaque to the coordinator.
    Signal { from: ConnectionId, payload: Value },
    /// A chat message fanned out to a room.
    Chat { message: ChatMessage },
    /// An error surfaced to a single connection, such as a rejected join.
    Error { message: String },
}

/// The sending half of a connection's event queue. Sends never block, and a
/// closed receiver means the connection is already gone, so the event is
/// simply dropped.
pub type Outbox = UnboundedSender<SessionEvent>;
