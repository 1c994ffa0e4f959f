mod room;

use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::{
    chat::{ChatMessage, NewChatMessage},
    events::SessionEvent,
    ConnectionId, Database, LimelightContext,
};

pub use room::*;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room already has an active streamer")]
    StreamerPresent,
}

/// Tracks which connections are in which rooms, and moves them through the
/// join, leave, and disconnect transitions.
pub struct RoomManager<Db> {
    context: LimelightContext<Db>,
}

impl<Db> RoomManager<Db>
where
    Db: Database,
{
    pub fn new(context: &LimelightContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Registers a connection in a room, creating the room if it does not
    /// exist yet. A streamer join is rejected while another live connection
    /// is already streaming there; the earlier streamer keeps the room.
    pub fn join(
        &self,
        connection_id: ConnectionId,
        room_id: &str,
        display_name: &str,
        is_streamer: bool,
    ) -> Result<(), RoomError> {
        // An unregistered connection has nowhere to receive events
        let Some(outbox) = self
            .context
            .connections
            .get(&connection_id)
            .map(|o| o.clone())
        else {
            return Ok(());
        };

        let participant = Participant::new(
            connection_id,
            display_name.to_string(),
            is_streamer,
            outbox,
        );

        let room = self
            .context
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Room::new(room_id.to_string())));

        let result = room.join(participant);
        drop(room);

        if result.is_ok() {
            let role = if is_streamer { "streamer" } else { "viewer" };
            info!("{} joined room {} as {}", display_name, room_id, role);
        }

        result
    }

    /// Removes a connection from a room, tearing the room down when it
    /// empties. Unknown rooms and non-members are a no-op.
    pub fn leave(&self, connection_id: ConnectionId, room_id: &str) {
        let Some(room) = self.context.rooms.get(room_id).map(|r| r.clone()) else {
            return;
        };

        if let Some(left) = room.remove(connection_id) {
            info!("{} left room {}", left.display_name, room_id);
        }

        self.context.rooms.remove_if(room_id, |_, room| room.is_empty());
    }

    /// Transport-level cleanup: removes the connection from every room it is
    /// in. A connection is expected to sit in at most one room, but nothing
    /// here relies on that.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        let joined: Vec<RoomId> = self
            .context
            .rooms
            .iter()
            .filter(|entry| entry.value().contains(connection_id))
            .map(|entry| entry.key().clone())
            .collect();

        for room_id in joined {
            self.leave(connection_id, &room_id);
        }
    }

    /// Canonicalizes a chat message and delivers it to every member of the
    /// room, the author included. Unknown rooms swallow the message.
    pub fn send_chat(&self, room_id: &str, raw: NewChatMessage) {
        let Some(room) = self.context.rooms.get(room_id).map(|r| r.clone()) else {
            return;
        };

        let message = ChatMessage::canonicalize(raw);
        room.broadcast(SessionEvent::Chat { message });
    }

    /// Returns the live room, if one exists.
    pub fn room(&self, room_id: &str) -> Option<Arc<Room>> {
        self.context.rooms.get(room_id).map(|r| r.clone())
    }

    /// Live viewer count for a room, 0 when the room does not exist.
    pub fn viewer_count(&self, room_id: &str) -> usize {
        self.context
            .rooms
            .get(room_id)
            .map(|r| r.viewer_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    use super::*;
    use crate::{Limelight, MemoryDatabase};

    fn coordinator() -> Limelight<MemoryDatabase> {
        Limelight::new(MemoryDatabase::default())
    }

    fn connect(
        limelight: &Limelight<MemoryDatabase>,
    ) -> (ConnectionId, UnboundedReceiver<SessionEvent>) {
        let (outbox, events) = unbounded_channel();
        (limelight.connect(outbox), events)
    }

    fn drain(events: &mut UnboundedReceiver<SessionEvent>) {
        while events.try_recv().is_ok() {}
    }

    #[test]
    fn streamer_then_viewer_scenario() {
        let limelight = coordinator();

        let (alice, mut alice_events) = connect(&limelight);
        limelight
            .rooms
            .join(alice, "r1", "Alice", true)
            .expect("streamer joins empty room");

        match alice_events.try_recv().expect("alice gets her peer set") {
            SessionEvent::PeersInRoom { peers } => assert!(peers.is_empty()),
            other => panic!("expected peer set, got {:?}", other),
        }

        let (bob, mut bob_events) = connect(&limelight);
        limelight
            .rooms
            .join(bob, "r1", "Bob", false)
            .expect("viewer joins");

        match bob_events.try_recv().expect("bob gets his peer set") {
            SessionEvent::PeersInRoom { peers } => {
                assert_eq!(peers.len(), 1);
                assert_eq!(peers[0].id, alice);
                assert_eq!(peers[0].name, "Alice");
                assert!(peers[0].is_streamer);
            }
            other => panic!("expected peer set, got {:?}", other),
        }

        match alice_events.try_recv().expect("alice learns about bob") {
            SessionEvent::PeerJoined {
                peer_id,
                name,
                is_streamer,
            } => {
                assert_eq!(peer_id, bob);
                assert_eq!(name, "Bob");
                assert!(!is_streamer);
            }
            other => panic!("expected join notification, got {:?}", other),
        }

        limelight.disconnect(alice);

        match bob_events.try_recv().expect("bob learns alice left") {
            SessionEvent::PeerLeft {
                peer_id,
                is_streamer,
            } => {
                assert_eq!(peer_id, alice);
                assert!(is_streamer);
            }
            other => panic!("expected leave notification, got {:?}", other),
        }

        let room = limelight.rooms.room("r1").expect("room still has bob");
        assert_eq!(room.streamer(), None);

        limelight.disconnect(bob);
        assert!(limelight.rooms.room("r1").is_none());
    }

    #[test]
    fn second_streamer_join_is_rejected() {
        let limelight = coordinator();

        let (alice, _alice_events) = connect(&limelight);
        limelight.rooms.join(alice, "r1", "Alice", true).unwrap();

        let (carol, mut carol_events) = connect(&limelight);
        let result = limelight.rooms.join(carol, "r1", "Carol", true);

        assert!(matches!(result, Err(RoomError::StreamerPresent)));

        let room = limelight.rooms.room("r1").unwrap();
        assert_eq!(room.streamer(), Some(alice));
        assert!(!room.contains(carol));
        assert!(carol_events.try_recv().is_err());

        // Once the slot frees up, the next streamer join succeeds
        limelight.rooms.leave(alice, "r1");
        limelight.rooms.join(carol, "r1", "Carol", true).unwrap();
        assert_eq!(limelight.rooms.room("r1").unwrap().streamer(), Some(carol));
    }

    #[test]
    fn viewers_never_learn_about_each_other() {
        let limelight = coordinator();

        let (alice, mut alice_events) = connect(&limelight);
        limelight.rooms.join(alice, "r1", "Alice", true).unwrap();

        let (bob, mut bob_events) = connect(&limelight);
        limelight.rooms.join(bob, "r1", "Bob", false).unwrap();

        drain(&mut alice_events);
        drain(&mut bob_events);

        let (carol, mut carol_events) = connect(&limelight);
        limelight.rooms.join(carol, "r1", "Carol", false).unwrap();

        match carol_events.try_recv().expect("carol gets her peer set") {
            SessionEvent::PeersInRoom { peers } => {
                assert_eq!(peers.len(), 1);
                assert_eq!(peers[0].id, alice);
            }
            other => panic!("expected peer set, got {:?}", other),
        }

        // The streamer is told, the other viewer is not
        assert!(matches!(
            alice_events.try_recv(),
            Ok(SessionEvent::PeerJoined { .. })
        ));
        assert!(bob_events.try_recv().is_err());
    }

    #[test]
    fn viewer_joining_an_empty_room_sees_no_peers() {
        let limelight = coordinator();

        let (bob, mut bob_events) = connect(&limelight);
        limelight.rooms.join(bob, "r1", "Bob", false).unwrap();

        match bob_events.try_recv().expect("bob gets his peer set") {
            SessionEvent::PeersInRoom { peers } => assert!(peers.is_empty()),
            other => panic!("expected peer set, got {:?}", other),
        }
    }

    #[test]
    fn disconnect_cleans_every_room() {
        let limelight = coordinator();

        let (alice, _alice_events) = connect(&limelight);
        limelight.rooms.join(alice, "r1", "Alice", false).unwrap();
        limelight.rooms.join(alice, "r2", "Alice", false).unwrap();

        limelight.disconnect(alice);

        assert!(limelight.rooms.room("r1").is_none());
        assert!(limelight.rooms.room("r2").is_none());
    }

    #[test]
    fn leave_after_disconnect_is_a_noop() {
        let limelight = coordinator();

        let (alice, _alice_events) = connect(&limelight);
        limelight.rooms.join(alice, "r1", "Alice", true).unwrap();

        limelight.disconnect(alice);
        limelight.rooms.leave(alice, "r1");
        limelight.disconnect(alice);

        assert!(limelight.rooms.room("r1").is_none());
    }

    #[test]
    fn chat_reaches_every_member_including_author() {
        let limelight = coordinator();

        let (alice, mut alice_events) = connect(&limelight);
        limelight.rooms.join(alice, "r1", "Alice", true).unwrap();

        let (bob, mut bob_events) = connect(&limelight);
        limelight.rooms.join(bob, "r1", "Bob", false).unwrap();

        drain(&mut alice_events);
        drain(&mut bob_events);

        limelight.rooms.send_chat(
            "r1",
            NewChatMessage {
                author: "Bob".to_string(),
                text: "hello".to_string(),
                is_owner: false,
                is_gift: false,
                gift_type: None,
            },
        );

        let to_alice = match alice_events.try_recv().unwrap() {
            SessionEvent::Chat { message } => message,
            other => panic!("expected chat, got {:?}", other),
        };
        let to_bob = match bob_events.try_recv().unwrap() {
            SessionEvent::Chat { message } => message,
            other => panic!("expected chat, got {:?}", other),
        };

        assert_eq!(to_alice.id, to_bob.id);
        assert_eq!(to_bob.author, "Bob");
        assert_eq!(to_bob.text, "hello");
        assert!((Utc::now() - to_bob.timestamp).num_seconds() < 5);

        limelight.rooms.send_chat(
            "r1",
            NewChatMessage {
                author: "Bob".to_string(),
                text: "again".to_string(),
                is_owner: false,
                is_gift: false,
                gift_type: None,
            },
        );

        let second = match bob_events.try_recv().unwrap() {
            SessionEvent::Chat { message } => message,
            other => panic!("expected chat, got {:?}", other),
        };

        assert_ne!(second.id, to_bob.id);
    }

    #[test]
    fn chat_to_an_unknown_room_is_dropped() {
        let limelight = coordinator();

        let (alice, mut alice_events) = connect(&limelight);
        limelight.rooms.join(alice, "r1", "Alice", true).unwrap();
        drain(&mut alice_events);

        limelight.rooms.send_chat(
            "nowhere",
            NewChatMessage {
                author: "Alice".to_string(),
                text: "anyone?".to_string(),
                is_owner: false,
                is_gift: false,
                gift_type: None,
            },
        );

        assert!(alice_events.try_recv().is_err());
    }
}
