use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, query, query_as, Error as SqlxError, FromRow, PgPool};

use crate::{
    Database, DatabaseError, DatabaseResult, IntoDatabaseError, NewStream, PrimaryKey, Result,
    StreamData, StreamKind,
};

use async_trait::async_trait;

/// A postgres database implementation for limelight
pub struct PgDatabase {
    pool: PgPool,
}

/// A stream row as it comes out of postgres. The kind column is plain text
/// and is parsed on the way out.
#[derive(FromRow)]
struct StreamRow {
    id: PrimaryKey,
    room_id: String,
    streamer_name: String,
    title: String,
    kind: String,
    price: Option<i32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn stream_by_id(&self, stream_id: PrimaryKey) -> Result<StreamData> {
        let row: StreamRow = query_as("SELECT * FROM streams WHERE id = $1")
            .bind(stream_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("stream", "id"))?;

        row.into_data()
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn active_stream_by_room_id(&self, room_id: &str) -> Result<StreamData> {
        let row: StreamRow =
            query_as("SELECT * FROM streams WHERE room_id = $1 AND is_active = true")
                .bind(room_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.not_found_or("stream", "room_id"))?;

        row.into_data()
    }

    async fn list_active_streams(&self) -> Result<Vec<StreamData>> {
        let rows: Vec<StreamRow> =
            query_as("SELECT * FROM streams WHERE is_active = true ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        rows.into_iter().map(StreamRow::into_data).collect()
    }

    async fn create_stream(&self, new_stream: NewStream) -> Result<StreamData> {
        self.active_stream_by_room_id(&new_stream.room_id)
            .await
            .conflict_or_ok("stream", "room_id", &new_stream.room_id)?;

        let row: StreamRow = query_as(
            "
            INSERT INTO streams (room_id, streamer_name, title, kind, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *",
        )
        .bind(&new_stream.room_id)
        .bind(&new_stream.streamer_name)
        .bind(&new_stream.title)
        .bind(new_stream.kind.as_str())
        .bind(new_stream.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        row.into_data()
    }

    async fn end_stream(&self, room_id: &str) -> Result<StreamData> {
        let stream = self.active_stream_by_room_id(room_id).await?;

        query("UPDATE streams SET is_active = false, ended_at = now() WHERE id = $1")
            .bind(stream.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.stream_by_id(stream.id).await
    }
}

impl StreamRow {
    fn into_data(self) -> Result<StreamData> {
        let kind = StreamKind::from_str(&self.kind).ok_or_else(|| {
            DatabaseError::Internal(format!("unknown stream kind: {}", self.kind).into())
        })?;

        Ok(StreamData {
            id: self.id,
            room_id: self.room_id,
            streamer_name: self.streamer_name,
            title: self.title,
            kind,
            price: self.price,
            is_active: self.is_active,
            created_at: self.created_at,
            ended_at: self.ended_at,
        })
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
