//! Feed assembly: window filter, ranking and truncation
//!
//! Rows from a reader arrive unordered and possibly unbounded. The assembler
//! drops anything outside the requested window, rejects rows whose score is
//! not a finite non-negative number, orders the rest and caps the result at
//! the request limit.
//!
//! Ordering:
//! - score descending
//! - created_at descending (newer first) on equal score
//! - id ascending as the final tie-break

use crate::domain::{FeedEntry, FeedRequest, FeedRow};
use crate::error::{FeedError, FeedResult};
use std::cmp::Ordering;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedAssembler;

impl FeedAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, request: &FeedRequest, rows: Vec<FeedRow>) -> FeedResult<Vec<FeedEntry>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let input_count = rows.len();
        let mut candidates = Vec::with_capacity(input_count);

        for row in rows {
            if !request.contains(row.post.created_at) {
                warn!(
                    post_id = %row.post.id,
                    created_at = row.post.created_at,
                    "Dropping row outside the requested window"
                );
                continue;
            }
            if !row.score.is_finite() || row.score < 0.0 {
                return Err(FeedError::malformed(
                    &row.post.id,
                    format!("score {} is not a finite non-negative number", row.score),
                ));
            }
            candidates.push(row);
        }

        candidates.sort_by(rank_order);
        candidates.truncate(request.limit);

        let entries = candidates
            .into_iter()
            .map(FeedEntry::try_from)
            .collect::<FeedResult<Vec<_>>>()?;

        debug!(
            "Assembled {} of {} rows for viewer {}",
            entries.len(),
            input_count,
            request.viewer
        );

        Ok(entries)
    }
}

/// Total order used for ranking
pub fn rank_order(a: &FeedRow, b: &FeedRow) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.post.created_at.cmp(&a.post.created_at))
        .then_with(|| a.post.id.cmp(&b.post.id))
}
