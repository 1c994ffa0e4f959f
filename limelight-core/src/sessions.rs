use serde_json::Value;

use crate::{events::SessionEvent, util::Id, Database, LimelightContext, Outbox};

/// Marker for connection ids. The connection itself lives in the transport
/// layer; the coordinator only ever sees its id and outbox.
pub struct Connection;

pub type ConnectionId = Id<Connection>;

/// Tracks every live connection's outbox and relays signaling payloads
/// between them.
pub struct SessionManager<Db> {
    context: LimelightContext<Db>,
}

impl<Db> SessionManager<Db>
where
    Db: Database,
{
    pub fn new(context: &LimelightContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Registers a connection's outbox and assigns it an id.
    pub fn register(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::new();
        self.context.connections.insert(id, outbox);

        id
    }

    /// Forgets a connection. Events still queued in its outbox are dropped
    /// along with it.
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.context.connections.remove(&connection_id);
    }

    /// Relays an opaque negotiation payload to another connection, tagged
    /// with the sender. Unknown or already-disconnected targets are dropped
    /// silently; the negotiation protocol on top owns timeouts and retries.
    pub fn relay(&self, from: ConnectionId, to: ConnectionId, payload: Value) {
        if let Some(outbox) = self.context.connections.get(&to) {
            let _ = outbox.send(SessionEvent::Signal { from, payload });
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    use super::*;
    use crate::{Limelight, MemoryDatabase};

    fn connect(
        limelight: &Limelight<MemoryDatabase>,
    ) -> (ConnectionId, UnboundedReceiver<SessionEvent>) {
        let (outbox, events) = unbounded_channel();
        (limelight.connect(outbox), events)
    }

    #[test]
    fn relay_delivers_payload_unchanged() {
        let limelight = Limelight::new(MemoryDatabase::default());

        let (alice, _alice_events) = connect(&limelight);
        let (bob, mut bob_events) = connect(&limelight);

        let payload = json!({
            "kind": "offer",
            "sdp": "v=0\r\no=- 46117 2 IN IP4 127.0.0.1",
            "candidates": [1, 2, 3],
        });

        limelight.sessions.relay(alice, bob, payload.clone());

        match bob_events.try_recv().expect("bob receives the signal") {
            SessionEvent::Signal {
                from,
                payload: received,
            } => {
                assert_eq!(from, alice);
                assert_eq!(received, payload);
            }
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn relay_to_a_disconnected_target_is_dropped() {
        let limelight = Limelight::new(MemoryDatabase::default());

        let (alice, _alice_events) = connect(&limelight);
        let (bob, mut bob_events) = connect(&limelight);

        limelight.disconnect(bob);
        limelight.sessions.relay(alice, bob, json!({ "kind": "offer" }));

        assert!(bob_events.try_recv().is_err());
    }

    #[test]
    fn relay_does_not_require_room_membership() {
        let limelight = Limelight::new(MemoryDatabase::default());

        let (alice, _alice_events) = connect(&limelight);
        let (bob, mut bob_events) = connect(&limelight);

        // Neither connection has joined any room
        limelight.sessions.relay(alice, bob, json!({ "kind": "answer" }));

        assert!(matches!(
            bob_events.try_recv(),
            Ok(SessionEvent::Signal { .. })
        ));
    }
}
