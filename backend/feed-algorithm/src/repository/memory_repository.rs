use super::FeedReader;
use crate::domain::{FeedRequest, FeedRow, Post, RawEngagement};
use crate::error::{FeedError, FeedResult};
use crate::scoring::{ScoringModel, UnknownEngagementPolicy};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct EngagementEdge {
    from_post: String,
    to_post: String,
    label: String,
}

/// In-process graph with the same traversal semantics as the Neo4j reader.
///
/// The reacting post's `author` stands in for the AUTHORED relationship.
/// Edges whose reacting post is unknown are skipped, as an unmatched
/// OPTIONAL MATCH would be.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    posts: Vec<Post>,
    engagements: Vec<EngagementEdge>,
    /// (viewer, user) -> similarity score
    similarity: HashMap<(String, String), f64>,
    scoring: ScoringModel,
    unknown_engagement: UnknownEngagementPolicy,
    latency: Option<Duration>,
    failure: Option<String>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph whose every read fails as if the store were unreachable
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringModel) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_unknown_engagement(mut self, policy: UnknownEngagementPolicy) -> Self {
        self.unknown_engagement = policy;
        self
    }

    /// Delay every read, e.g. to exercise query deadlines
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn add_post(&mut self, post: Post) -> &mut Self {
        self.posts.push(post);
        self
    }

    /// Engagement edge `from_post -[label]-> to_post`
    pub fn add_engagement(&mut self, from_post: &str, to_post: &str, label: &str) -> &mut Self {
        self.engagements.push(EngagementEdge {
            from_post: from_post.to_string(),
            to_post: to_post.to_string(),
            label: label.to_string(),
        });
        self
    }

    /// Similarity edge `viewer -[SIMILAR {score}]-> user`; a later call for
    /// the same pair replaces the earlier score
    pub fn add_similarity(&mut self, viewer: &str, user: &str, score: f64) -> &mut Self {
        self.similarity
            .insert((viewer.to_string(), user.to_string()), score);
        self
    }

    fn raw_engagements(&self, post_id: &str, viewer: &str) -> Vec<RawEngagement> {
        self.engagements
            .iter()
            .filter(|edge| edge.to_post == post_id)
            .filter_map(|edge| {
                let reacting = self.posts.iter().find(|p| p.id == edge.from_post)?;
                let affinity = self
                    .similarity
                    .get(&(viewer.to_string(), reacting.author.clone()))
                    .copied();

                Some(RawEngagement {
                    edge_type: edge.label.clone(),
                    author: Some(reacting.author.clone()),
                    affinity,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl FeedReader for MemoryGraph {
    async fn read_feed(&self, request: &FeedRequest) -> FeedResult<Vec<FeedRow>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = &self.failure {
            return Err(FeedError::StorageUnavailable(reason.clone()));
        }

        let mut rows = Vec::new();
        for post in self.posts.iter().filter(|p| request.contains(p.created_at)) {
            let raw = self.raw_engagements(&post.id, &request.viewer);
            let score = self
                .scoring
                .score_raw(&post.id, raw, self.unknown_engagement)?;

            rows.push(FeedRow {
                post: post.clone(),
                score,
            });
        }

        debug!(
            "Read {} candidate posts for viewer {} from memory graph",
            rows.len(),
            request.viewer
        );

        Ok(rows)
    }

    async fn health_check(&self) -> FeedResult<()> {
        match &self.failure {
            Some(reason) => Err(FeedError::StorageUnavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn request(viewer: &str) -> FeedRequest {
        FeedRequest::new(
            viewer,
            DateTime::from_timestamp(100, 0).unwrap(),
            DateTime::from_timestamp(200, 0).unwrap(),
            10,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_only_posts_inside_window() {
        let mut graph = MemoryGraph::new();
        graph
            .add_post(Post::new("early", 1, "alice", "", 100))
            .add_post(Post::new("inside", 1, "alice", "", 150))
            .add_post(Post::new("late", 1, "alice", "", 200));

        let rows = graph.read_feed(&request("viewer")).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post.id, "inside");
        assert_eq!(rows[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_engagement_from_reacting_post_outside_window_still_counts() {
        let mut graph = MemoryGraph::new();
        graph
            .add_post(Post::new("target", 1, "alice", "", 150))
            .add_post(Post::new("reply", 1, "bob", "", 500))
            .add_engagement("reply", "target", "REPLY")
            .add_similarity("viewer", "bob", 0.5);

        let rows = graph.read_feed(&request("viewer")).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 630.0);
    }

    #[tokio::test]
    async fn test_similarity_is_per_viewer() {
        let mut graph = MemoryGraph::new();
        graph
            .add_post(Post::new("target", 1, "alice", "", 150))
            .add_post(Post::new("reply", 1, "bob", "", 500))
            .add_engagement("reply", "target", "REPLY")
            .add_similarity("someone_else", "bob", 0.5);

        let rows = graph.read_feed(&request("viewer")).await.unwrap();

        assert_eq!(rows[0].score, 3.0);
    }

    #[tokio::test]
    async fn test_unknown_edge_rejected_or_ignored_per_policy() {
        let mut graph = MemoryGraph::new();
        graph
            .add_post(Post::new("target", 1, "alice", "", 150))
            .add_post(Post::new("quote", 1, "bob", "", 500))
            .add_engagement("quote", "target", "QUOTE");

        let err = graph.read_feed(&request("viewer")).await.unwrap_err();
        assert!(matches!(err, FeedError::MalformedRow { .. }));

        let graph = graph.with_unknown_engagement(UnknownEngagementPolicy::Ignore);
        let rows = graph.read_feed(&request("viewer")).await.unwrap();
        assert_eq!(rows[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_unavailable_graph_fails_reads_and_health() {
        let graph = MemoryGraph::unavailable("connection refused");

        assert!(matches!(
            graph.read_feed(&request("viewer")).await,
            Err(FeedError::StorageUnavailable(_))
        ));
        assert!(graph.health_check().await.is_err());
    }
}
