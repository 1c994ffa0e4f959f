use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{Database, DatabaseError, NewStream, PrimaryKey, Result, StreamData};

/// An in-memory [Database] implementation, used by tests and setups without a
/// postgres instance. Rows are never removed, matching the soft-close
/// semantics of the real store.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    streams: Mutex<Vec<StreamData>>,
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn active_stream_by_room_id(&self, room_id: &str) -> Result<StreamData> {
        self.streams
            .lock()
            .iter()
            .find(|s| s.is_active && s.room_id == room_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "stream",
                identifier: "room_id",
            })
    }

    async fn list_active_streams(&self) -> Result<Vec<StreamData>> {
        Ok(self
            .streams
            .lock()
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn create_stream(&self, new_stream: NewStream) -> Result<StreamData> {
        let mut streams = self.streams.lock();

        let duplicate = streams
            .iter()
            .any(|s| s.is_active && s.room_id == new_stream.room_id);

        if duplicate {
            return Err(DatabaseError::Conflict {
                resource: "stream",
                field: "room_id",
                value: new_stream.room_id,
            });
        }

        let stream = StreamData {
            id: streams.len() as PrimaryKey + 1,
            room_id: new_stream.room_id,
            streamer_name: new_stream.streamer_name,
            title: new_stream.title,
            kind: new_stream.kind,
            price: new_stream.price,
            is_active: true,
            created_at: Utc::now(),
            ended_at: None,
        };

        streams.push(stream.clone());

        Ok(stream)
    }

    async fn end_stream(&self, room_id: &str) -> Result<StreamData> {
        let mut streams = self.streams.lock();

        let stream = streams
            .iter_mut()
            .find(|s| s.is_active && s.room_id == room_id)
            .ok_or(DatabaseError::NotFound {
                resource: "stream",
                identifier: "room_id",
            })?;

        stream.is_active = false;
        stream.ended_at = Some(Utc::now());

        Ok(stream.clone())
    }
}
