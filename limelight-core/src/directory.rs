use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::info;

use crate::{Database, DatabaseError, LimelightContext, NewStream, Result, StreamData};

/// How long a room must be continuously absent from the registry before its
/// active record is considered stale.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// How often the reconciliation sweep should run.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// An active stream record enriched with its live viewer count.
#[derive(Debug, Clone)]
pub struct ActiveStream {
    pub data: StreamData,
    /// Connections currently watching, read from the room registry at call
    /// time. The catalog and the registry are never written into each other.
    pub viewer_count: usize,
}

/// Read/write surface over the persisted stream catalog.
pub struct StreamDirectory<Db> {
    context: LimelightContext<Db>,
    /// Rooms with an active record but no live room, and when each was first
    /// seen missing.
    missing_since: DashMap<String, DateTime<Utc>>,
}

impl<Db> StreamDirectory<Db>
where
    Db: Database,
{
    pub fn new(context: &LimelightContext<Db>) -> Self {
        Self {
            context: context.clone(),
            missing_since: Default::default(),
        }
    }

    /// Creates an active stream record for a room, or returns the existing
    /// one untouched. Calling this twice is not an error.
    pub async fn start_stream(&self, new_stream: NewStream) -> Result<ActiveStream> {
        let room_id = new_stream.room_id.clone();

        let data = match self.context.database.create_stream(new_stream).await {
            Err(DatabaseError::Conflict { .. }) => {
                self.context.database.active_stream_by_room_id(&room_id).await?
            }
            result => {
                let data = result?;
                info!("Stream started in room {}", data.room_id);
                data
            }
        };

        Ok(self.enrich(data))
    }

    /// Returns the active record for a room.
    pub async fn stream(&self, room_id: &str) -> Result<ActiveStream> {
        let data = self.context.database.active_stream_by_room_id(room_id).await?;

        Ok(self.enrich(data))
    }

    /// Soft-closes the active record for a room. Rooms that never started or
    /// already ended are a no-op.
    pub async fn end_stream(&self, room_id: &str) -> Result<()> {
        match self.context.database.end_stream(room_id).await {
            Ok(stream) => {
                info!("Stream in room {} ended", stream.room_id);
                Ok(())
            }
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Every active record, enriched with live viewer counts.
    pub async fn list_active(&self) -> Result<Vec<ActiveStream>> {
        let streams = self.context.database.list_active_streams().await?;

        Ok(streams.into_iter().map(|s| self.enrich(s)).collect())
    }

    /// Closes active records whose room has been absent from the registry
    /// for longer than the threshold. A record's room reappearing before the
    /// threshold clears its candidacy, so a streamer reconnecting within the
    /// window keeps the record alive.
    pub async fn reconcile(&self, threshold: Duration) -> Result<()> {
        let now = Utc::now();
        let streams = self.context.database.list_active_streams().await?;

        // Rooms that are no longer advertised need no tracking
        self.missing_since
            .retain(|room_id, _| streams.iter().any(|s| &s.room_id == room_id));

        for stream in streams {
            if self.context.rooms.contains_key(&stream.room_id) {
                self.missing_since.remove(&stream.room_id);
                continue;
            }

            let first_missing = *self
                .missing_since
                .entry(stream.room_id.clone())
                .or_insert(now);

            let absent_for = (now - first_missing).to_std().unwrap_or_default();

            if absent_for >= threshold {
                info!("Closing stale stream record for room {}", stream.room_id);
                self.end_stream(&stream.room_id).await?;
                self.missing_since.remove(&stream.room_id);
            }
        }

        Ok(())
    }

    fn enrich(&self, data: StreamData) -> ActiveStream {
        let viewer_count = self
            .context
            .rooms
            .get(&data.room_id)
            .map(|r| r.viewer_count())
            .unwrap_or(0);

        ActiveStream { data, viewer_count }
    }
}
