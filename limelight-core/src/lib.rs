mod chat;
mod db;
mod directory;
mod events;
mod rooms;
mod sessions;
mod util;

use std::sync::Arc;

use dashmap::DashMap;

pub use chat::*;
pub use db::*;
pub use directory::*;
pub use events::*;
pub use rooms::*;
pub use sessions::*;
pub use util::*;

// Reduces verbosity
type Store<K, T> = Arc<DashMap<K, Arc<T>>>;

/// The limelight coordinator, facilitating broadcast rooms, signaling relay,
/// chat, and the stream directory.
pub struct Limelight<Db> {
    context: LimelightContext<Db>,

    pub sessions: SessionManager<Db>,
    pub rooms: RoomManager<Db>,
    pub directory: StreamDirectory<Db>,
}

/// A type passed to the coordinator's components, to access shared state.
pub struct LimelightContext<Db> {
    pub database: Arc<Db>,

    /// Every room with at least one participant. Rooms have no existence
    /// beyond this map.
    pub rooms: Store<RoomId, Room>,
    /// The outbox of every live connection.
    pub connections: Arc<DashMap<ConnectionId, Outbox>>,
}

impl<Db> Limelight<Db>
where
    Db: Database,
{
    pub fn new(database: Db) -> Self {
        let context = LimelightContext {
            database: Arc::new(database),

            rooms: Default::default(),
            connections: Default::default(),
        };

        Self {
            sessions: SessionManager::new(&context),
            rooms: RoomManager::new(&context),
            directory: StreamDirectory::new(&context),
            context,
        }
    }

    /// Registers a new connection and returns its id.
    pub fn connect(&self, outbox: Outbox) -> ConnectionId {
        self.sessions.register(outbox)
    }

    /// Removes a connection from every room it is in and forgets it.
    /// Safe to race with an explicit leave for the same connection.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        self.rooms.disconnect(connection_id);
        self.sessions.unregister(connection_id);
    }

    pub fn context(&self) -> &LimelightContext<Db> {
        &self.context
    }
}

impl<Db> Clone for LimelightContext<Db>
where
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            rooms: self.rooms.clone(),
            connections: self.connections.clone(),
        }
    }
}
