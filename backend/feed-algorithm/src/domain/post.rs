use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post node as stored in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub kind: u32,
    /// Author pubkey
    pub author: String,
    pub raw: String,
    /// Epoch seconds
    pub created_at: i64,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        kind: u32,
        author: impl Into<String>,
        raw: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            author: author.into(),
            raw: raw.into(),
            created_at,
        }
    }
}

/// Row produced by a feed reader: a candidate post and its aggregated score
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub post: Post,
    pub score: f64,
}

/// Ranked feed entry returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(rename = "event_id")]
    pub id: String,
    pub kind: u32,
    pub pubkey: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "content")]
    pub raw: String,
    pub score: f64,
}

impl TryFrom<FeedRow> for FeedEntry {
    type Error = FeedError;

    fn try_from(row: FeedRow) -> FeedResult<Self> {
        let created_at = DateTime::from_timestamp(row.post.created_at, 0).ok_or_else(|| {
            FeedError::malformed(
                &row.post.id,
                format!("created_at {} is not a valid timestamp", row.post.created_at),
            )
        })?;

        Ok(Self {
            id: row.post.id,
            kind: row.post.kind,
            pubkey: row.post.author,
            created_at,
            raw: row.post.raw,
            score: row.score,
        })
    }
}
