use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};

/// Validated feed request: viewer, open time window and result cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub viewer: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: usize,
}

impl FeedRequest {
    /// Rejects empty viewers, empty windows and zero limits before any
    /// storage round trip happens.
    pub fn new(
        viewer: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> FeedResult<Self> {
        let viewer = viewer.into();

        if viewer.trim().is_empty() {
            return Err(FeedError::InvalidRequest(
                "viewer pubkey must not be empty".to_string(),
            ));
        }
        if end <= start {
            return Err(FeedError::InvalidRequest(format!(
                "window end {} must be after start {}",
                end, start
            )));
        }
        if limit == 0 {
            return Err(FeedError::InvalidRequest(
                "limit must be positive".to_string(),
            ));
        }

        Ok(Self {
            viewer,
            start,
            end,
            limit,
        })
    }

    /// Window lower bound in epoch seconds (exclusive)
    pub fn start_ts(&self) -> i64 {
        self.start.timestamp()
    }

    /// Window upper bound in epoch seconds (exclusive)
    pub fn end_ts(&self) -> i64 {
        self.end.timestamp()
    }

    /// Open-interval membership: `start < created_at < end`
    pub fn contains(&self, created_at: i64) -> bool {
        created_at > self.start_ts() && created_at < self.end_ts()
    }
}
