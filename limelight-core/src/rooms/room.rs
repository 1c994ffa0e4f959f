use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{events::SessionEvent, ConnectionId, Outbox};

use super::RoomError;

pub type RoomId = String;

/// A broadcast room: one streamer, any number of viewers.
///
/// All membership state lives behind a single mutex, so every mutation of a
/// room is a critical section of that room alone. Rooms never touch the
/// database and are gone the moment their last participant is.
pub struct Room {
    id: RoomId,
    state: Mutex<RoomState>,
}

#[derive(Default)]
struct RoomState {
    participants: HashMap<ConnectionId, Participant>,
    /// The connection currently acting as streamer, if any. At most one.
    streamer: Option<ConnectionId>,
}

/// A connection's presence in a room.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ConnectionId,
    pub display_name: String,
    pub is_streamer: bool,
    outbox: Outbox,
}

/// A participant as seen by the other participants.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: ConnectionId,
    pub name: String,
    pub is_streamer: bool,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            state: Default::default(),
        }
    }

    /// Registers a participant and notifies the peers that should learn about
    /// it. The joiner receives its initial peer set exactly once: a streamer
    /// sees the current viewers, a viewer sees only the streamer. Viewers are
    /// never revealed to each other, since all media fans through the streamer.
    pub fn join(&self, participant: Participant) -> Result<(), RoomError> {
        let mut state = self.state.lock();

        if participant.is_streamer {
            let occupied = state.streamer.is_some_and(|id| id != participant.id);

            if occupied {
                return Err(RoomError::StreamerPresent);
            }
        }

        // A connection rejoining with a different role must not leave a stale
        // streamer back-reference behind
        if !participant.is_streamer && state.streamer == Some(participant.id) {
            state.streamer = None;
        }

        let peers: Vec<Peer> = if participant.is_streamer {
            state
                .participants
                .values()
                .filter(|p| !p.is_streamer)
                .map(Participant::peer)
                .collect()
        } else {
            state
                .streamer
                .and_then(|id| state.participants.get(&id))
                .map(Participant::peer)
                .into_iter()
                .collect()
        };

        let joined = participant.peer();

        // Everyone learns about a new streamer, only the streamer learns
        // about a new viewer
        let recipients = state
            .participants
            .values()
            .filter(|p| p.id != joined.id && (joined.is_streamer || p.is_streamer));

        for other in recipients {
            other.notify(SessionEvent::PeerJoined {
                peer_id: joined.id,
                name: joined.name.clone(),
                is_streamer: joined.is_streamer,
            });
        }

        participant.notify(SessionEvent::PeersInRoom { peers });

        if participant.is_streamer {
            state.streamer = Some(participant.id);
        }

        state.participants.insert(participant.id, participant);

        Ok(())
    }

    /// Removes a connection from the room, notifying everyone that remains.
    /// Returns the removed participant, or `None` if the connection was not a
    /// member, which makes racing leave and disconnect cleanups harmless.
    pub fn remove(&self, connection_id: ConnectionId) -> Option<Participant> {
        let mut state = self.state.lock();
        let removed = state.participants.remove(&connection_id)?;

        if state.streamer == Some(connection_id) {
            state.streamer = None;
        }

        for remaining in state.participants.values() {
            remaining.notify(SessionEvent::PeerLeft {
                peer_id: connection_id,
                is_streamer: removed.is_streamer,
            });
        }

        Some(removed)
    }

    /// Delivers an event to every current member, including the author of
    /// whatever caused it.
    pub fn broadcast(&self, event: SessionEvent) {
        let state = self.state.lock();

        for participant in state.participants.values() {
            participant.notify(event.clone());
        }
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.state.lock().participants.contains_key(&connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().participants.is_empty()
    }

    /// The connection currently streaming in this room, if any.
    pub fn streamer(&self) -> Option<ConnectionId> {
        self.state.lock().streamer
    }

    /// Number of connections currently watching, excluding the streamer.
    pub fn viewer_count(&self) -> usize {
        self.state
            .lock()
            .participants
            .values()
            .filter(|p| !p.is_streamer)
            .count()
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }
}

impl Participant {
    pub fn new(
        id: ConnectionId,
        display_name: String,
        is_streamer: bool,
        outbox: Outbox,
    ) -> Self {
        Self {
            id,
            display_name,
            is_streamer,
            outbox,
        }
    }

    pub fn peer(&self) -> Peer {
        Peer {
            id: self.id,
            name: self.display_name.clone(),
            is_streamer: self.is_streamer,
        }
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.outbox.send(event);
    }
}
