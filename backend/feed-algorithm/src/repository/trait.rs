use crate::domain::{FeedRequest, FeedRow};
use crate::error::FeedResult;

/// Read side of the graph store.
/// GraphRepository (Neo4j) and MemoryGraph (in-process) implement this.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedReader: Send + Sync {
    /// Run one read-only traversal for the request window and viewer.
    /// Returns scored candidate rows in no particular order; on error no
    /// partial rows are returned.
    async fn read_feed(&self, request: &FeedRequest) -> FeedResult<Vec<FeedRow>>;

    /// Health check (optional)
    async fn health_check(&self) -> FeedResult<()> {
        Ok(())
    }
}
