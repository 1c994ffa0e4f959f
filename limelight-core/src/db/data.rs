use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// The visibility and monetization class of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Public,
    Private,
    /// A paid head-to-head stream.
    Battle,
}

/// A persisted catalog entry advertising a room as live.
#[derive(Debug, Clone)]
pub struct StreamData {
    pub id: PrimaryKey,
    /// The room this stream runs in. Unique while the record is active.
    pub room_id: String,
    pub streamer_name: String,
    pub title: String,
    pub kind: StreamKind,
    /// Entry price, only meaningful for paid kinds.
    pub price: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NewStream {
    pub room_id: String,
    pub streamer_name: String,
    pub title: String,
    pub kind: StreamKind,
    pub price: Option<i32>,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Public => "public",
            StreamKind::Private => "private",
            StreamKind::Battle => "battle",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "battle" => Some(Self::Battle),
            _ => None,
        }
    }
}
