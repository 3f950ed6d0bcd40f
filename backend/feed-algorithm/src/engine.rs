//! Feed engine facade
//!
//! Wires a [`FeedReader`] and the [`FeedAssembler`] into one request/response
//! operation. `get_feed` is fail-soft: every failure is logged and collapses
//! to an empty feed. `try_get_feed` exposes the same pipeline with the error
//! kept, for callers that must tell "no content" from "degraded storage".

use crate::assembler::FeedAssembler;
use crate::config::Config;
use crate::domain::{FeedEntry, FeedRequest};
use crate::error::{FeedError, FeedResult};
use crate::repository::{FeedReader, GraphRepository};
use crate::scoring::ScoringModel;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Engine {
    reader: Arc<dyn FeedReader>,
    assembler: FeedAssembler,
    query_timeout: Duration,
    /// Largest accepted limit; `None` accepts any positive limit
    max_limit: Option<usize>,
}

impl Engine {
    pub fn new(reader: Arc<dyn FeedReader>) -> Self {
        Self {
            reader,
            assembler: FeedAssembler::new(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_limit: None,
        }
    }

    /// Build a Neo4j-backed engine from configuration
    pub fn connect(config: &Config) -> FeedResult<Self> {
        let repo = GraphRepository::new(
            &config.neo4j.uri,
            &config.neo4j.user,
            &config.neo4j.password,
        )?
        .with_scoring(ScoringModel::new(config.feed.scoring_strategy))
        .with_aggregation(config.feed.aggregation)
        .with_unknown_engagement(config.feed.unknown_engagement);

        info!(
            "Feed engine connected to {} (scoring = {}, aggregation = {})",
            config.neo4j.uri,
            config.feed.scoring_strategy,
            config.feed.aggregation.as_str()
        );

        let engine = Self::new(Arc::new(repo)).with_query_timeout(config.feed.query_timeout);
        Ok(match config.feed.max_limit {
            Some(max_limit) => engine.with_max_limit(max_limit),
            None => engine,
        })
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Reject requests asking for more than `max_limit` entries
    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = Some(max_limit);
        self
    }

    /// Ranked feed for `viewer` over the open window `(start, end)`.
    ///
    /// Never fails: invalid requests and storage errors are logged and yield
    /// an empty feed.
    pub async fn get_feed(
        &self,
        viewer: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<FeedEntry> {
        match self.try_get_feed(viewer, start, end, limit).await {
            Ok(entries) => entries,
            Err(e @ FeedError::InvalidRequest(_)) => {
                warn!(viewer = %viewer, error = %e, "Rejected feed request");
                Vec::new()
            }
            Err(e) => {
                error!(
                    viewer = %viewer,
                    reason = e.reason(),
                    error = %e,
                    "Failed to get feed"
                );
                Vec::new()
            }
        }
    }

    /// Same pipeline as [`Engine::get_feed`] with the failure kept
    pub async fn try_get_feed(
        &self,
        viewer: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> FeedResult<Vec<FeedEntry>> {
        let result = self.fetch(viewer, start, end, limit).await;

        match &result {
            Ok(entries) => {
                metrics::counter!("feed.query.success").increment(1);
                debug!(viewer = %viewer, "Returning {} feed entries", entries.len());
            }
            Err(e) => {
                metrics::counter!("feed.query.failure", "reason" => e.reason()).increment(1);
            }
        }

        result
    }

    async fn fetch(
        &self,
        viewer: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> FeedResult<Vec<FeedEntry>> {
        if let Some(max_limit) = self.max_limit {
            if limit > max_limit {
                return Err(FeedError::InvalidRequest(format!(
                    "limit {} exceeds the configured maximum of {}",
                    limit, max_limit
                )));
            }
        }

        let request = FeedRequest::new(viewer, start, end, limit)?;

        let rows = tokio::time::timeout(self.query_timeout, self.reader.read_feed(&request))
            .await
            .map_err(|_| FeedError::Timeout(self.query_timeout.as_millis() as u64))??;

        self.assembler.assemble(&request, rows)
    }

    pub async fn health_check(&self) -> FeedResult<()> {
        tokio::time::timeout(self.query_timeout, self.reader.health_check())
            .await
            .map_err(|_| FeedError::Timeout(self.query_timeout.as_millis() as u64))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedRow, Post};
    use crate::repository::MockFeedReader;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn row(id: &str, created_at: i64, score: f64) -> FeedRow {
        FeedRow {
            post: Post::new(id, 1, "npub_author", "", created_at),
            score,
        }
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_storage() {
        let mut reader = MockFeedReader::new();
        reader.expect_read_feed().never();

        let engine = Engine::new(Arc::new(reader));

        assert!(engine.get_feed("viewer", ts(200), ts(100), 10).await.is_empty());
        assert!(engine.get_feed("viewer", ts(100), ts(200), 0).await.is_empty());
        assert!(engine.get_feed("", ts(100), ts(200), 10).await.is_empty());

        let err = engine.try_get_feed("viewer", ts(100), ts(100), 10).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_collapses_to_empty_feed() {
        let mut reader = MockFeedReader::new();
        reader
            .expect_read_feed()
            .times(2)
            .returning(|_| Err(FeedError::StorageUnavailable("connection reset".to_string())));

        let engine = Engine::new(Arc::new(reader));

        assert!(engine.get_feed("viewer", ts(100), ts(200), 10).await.is_empty());
        assert!(matches!(
            engine.try_get_feed("viewer", ts(100), ts(200), 10).await,
            Err(FeedError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_limit_above_max_limit_is_rejected_not_shrunk() {
        let mut reader = MockFeedReader::new();
        reader.expect_read_feed().never();

        let engine = Engine::new(Arc::new(reader)).with_max_limit(2);

        let err = engine.try_get_feed("viewer", ts(100), ts(200), 3).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidRequest(ref msg) if msg.contains("limit 3")));
        assert!(engine.get_feed("viewer", ts(100), ts(200), 100).await.is_empty());
    }

    #[tokio::test]
    async fn test_limit_at_max_limit_is_passed_through() {
        let mut reader = MockFeedReader::new();
        reader
            .expect_read_feed()
            .withf(|request| request.limit == 2)
            .times(1)
            .returning(|_| {
                Ok(vec![
                    row("a", 150, 1.0),
                    row("b", 150, 3.0),
                    row("c", 150, 2.0),
                ])
            });

        let engine = Engine::new(Arc::new(reader)).with_max_limit(2);
        let feed = engine.get_feed("viewer", ts(100), ts(200), 2).await;

        let ids: Vec<_> = feed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_large_limit_is_not_capped_by_default() {
        let mut reader = MockFeedReader::new();
        reader
            .expect_read_feed()
            .withf(|request| request.limit == 10_000)
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let engine = Engine::new(Arc::new(reader));

        assert!(engine
            .try_get_feed("viewer", ts(100), ts(200), 10_000)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_passes_window_and_viewer_through() {
        let mut reader = MockFeedReader::new();
        reader
            .expect_read_feed()
            .withf(|request| {
                request.viewer == "npub_viewer"
                    && request.start_ts() == 100
                    && request.end_ts() == 200
                    && request.limit == 10
            })
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let engine = Engine::new(Arc::new(reader));

        let feed = engine
            .try_get_feed("npub_viewer", ts(100), ts(200), 10)
            .await
            .unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_collapses_to_empty_feed() {
        let mut reader = MockFeedReader::new();
        reader
            .expect_read_feed()
            .returning(|_| Ok(vec![row("ok", 150, 1.0), row("bad", 150, f64::INFINITY)]));

        let engine = Engine::new(Arc::new(reader));

        assert!(engine.get_feed("viewer", ts(100), ts(200), 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_health_check_delegates_to_reader() {
        let mut reader = MockFeedReader::new();
        reader
            .expect_health_check()
            .times(1)
            .returning(|| Err(FeedError::StorageUnavailable("down".to_string())));

        let engine = Engine::new(Arc::new(reader));

        assert!(engine.health_check().await.is_err());
    }
}
