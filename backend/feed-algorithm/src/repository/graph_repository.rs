use super::FeedReader;
use crate::domain::{FeedRequest, FeedRow, Post, RawEngagement};
use crate::error::{FeedError, FeedResult};
use crate::scoring::{
    check_unknown_engagements, saturate, ScoringModel, ScoringStrategy, UnknownEngagementPolicy,
};
use neo4rs::{query, Graph, Query, Row};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Where engagement aggregation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Fetch each candidate with its engagement edges and score in Rust
    #[default]
    InApplication,
    /// Aggregate, order and limit inside the Cypher query
    PushDown,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::InApplication => "application",
            Aggregation::PushDown => "push_down",
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "application" | "in_application" => Ok(Aggregation::InApplication),
            "push_down" | "pushdown" => Ok(Aggregation::PushDown),
            other => Err(format!("unknown aggregation mode '{}'", other)),
        }
    }
}

const CANDIDATES_WITH_ENGAGEMENTS: &str = r#"
    MATCH (p:Post)
    WHERE p.created_at > $Start AND p.created_at < $End
    OPTIONAL MATCH (u:User)-[:AUTHORED]->(:Post)-[e]->(p)
    OPTIONAL MATCH (:User {pubkey: $Pubkey})-[s:SIMILAR]->(u)
    WITH p, e, u, max(s.score) AS affinity
    RETURN p.id AS id, p.kind AS kind, p.author AS author, p.created_at AS created_at,
           coalesce(p.raw, p.content) AS raw,
           collect(CASE WHEN e IS NULL THEN NULL
                        ELSE {type: type(e), author: u.pubkey, affinity: affinity} END) AS engagements
"#;

const PERSONALIZED_PUSH_DOWN: &str = r#"
    MATCH (p:Post)
    WHERE p.created_at > $Start AND p.created_at < $End
    OPTIONAL MATCH (u:User)-[:AUTHORED]->(:Post)-[e:REPLY|LIKE|ZAP]->(p)
    OPTIONAL MATCH (:User {pubkey: $Pubkey})-[s:SIMILAR]->(u)
    WITH p, e, max(s.score) AS affinity
    WITH p, toFloat(sum(
        CASE type(e)
            WHEN 'REPLY' THEN $ReplyWeight
            WHEN 'LIKE' THEN $LikeWeight
            WHEN 'ZAP' THEN $ZapWeight
            ELSE 0.0
        END
        * coalesce(CASE WHEN affinity < 0.0 THEN 0.0 ELSE affinity END * $Amplification, 1.0)
    )) AS score
    ORDER BY score DESC, p.created_at DESC, p.id ASC
    LIMIT $Limit
    RETURN p.id AS id, p.kind AS kind, p.author AS author, p.created_at AS created_at,
           coalesce(p.raw, p.content) AS raw, score,
           size([(:User)-[:AUTHORED]->(:Post)-[x]->(p)
                 WHERE NOT type(x) IN ['REPLY', 'LIKE', 'ZAP'] | x]) AS unknown_engagements
"#;

const DISTINCT_AUTHOR_PUSH_DOWN: &str = r#"
    MATCH (p:Post)
    WHERE p.created_at > $Start AND p.created_at < $End
    OPTIONAL MATCH (u:User)-[:AUTHORED]->(:Post)-[e:REPLY|LIKE|ZAP]->(p)
    WITH p, type(e) AS edge_type, count(DISTINCT u) AS authors
    WITH p, toFloat(sum(
        CASE edge_type
            WHEN 'REPLY' THEN $ReplyWeight
            WHEN 'LIKE' THEN $LikeWeight
            WHEN 'ZAP' THEN $ZapWeight
            ELSE 0.0
        END * authors
    )) AS score
    ORDER BY score DESC, p.created_at DESC, p.id ASC
    LIMIT $Limit
    RETURN p.id AS id, p.kind AS kind, p.author AS author, p.created_at AS created_at,
           coalesce(p.raw, p.content) AS raw, score,
           size([(:User)-[:AUTHORED]->(:Post)-[x]->(p)
                 WHERE NOT type(x) IN ['REPLY', 'LIKE', 'ZAP'] | x]) AS unknown_engagements
"#;

/// Feed reader backed by Neo4j
#[derive(Clone)]
pub struct GraphRepository {
    graph: Arc<Graph>,
    scoring: ScoringModel,
    aggregation: Aggregation,
    unknown_engagement: UnknownEngagementPolicy,
}

impl GraphRepository {
    pub fn new(uri: &str, user: &str, password: &str) -> FeedResult<Self> {
        let graph = Graph::new(uri, user, password)?;
        Ok(Self::from_graph(Arc::new(graph)))
    }

    pub fn from_graph(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            scoring: ScoringModel::default(),
            aggregation: Aggregation::default(),
            unknown_engagement: UnknownEngagementPolicy::default(),
        }
    }

    pub fn with_scoring(mut self, scoring: ScoringModel) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_unknown_engagement(mut self, policy: UnknownEngagementPolicy) -> Self {
        self.unknown_engagement = policy;
        self
    }

    /// Health check - verify Neo4j connection
    pub async fn ping(&self) -> FeedResult<bool> {
        let mut result = self.graph.execute(query("RETURN 1 AS health")).await?;

        if let Some(row) = result.next().await? {
            let health: i64 = row.get("health").unwrap_or(0);
            Ok(health == 1)
        } else {
            Ok(false)
        }
    }

    /// Build the single traversal query for this request
    pub fn build_query(&self, request: &FeedRequest) -> Query {
        let cypher = match (self.aggregation, self.scoring.strategy()) {
            (Aggregation::InApplication, _) => CANDIDATES_WITH_ENGAGEMENTS,
            (Aggregation::PushDown, ScoringStrategy::Personalized) => PERSONALIZED_PUSH_DOWN,
            (Aggregation::PushDown, ScoringStrategy::DistinctAuthor) => DISTINCT_AUTHOR_PUSH_DOWN,
        };
        let weights = self.scoring.weights();

        query(cypher)
            .param("Start", request.start_ts())
            .param("End", request.end_ts())
            .param("Pubkey", request.viewer.clone())
            .param("Limit", i64::try_from(request.limit).unwrap_or(i64::MAX))
            .param("ReplyWeight", weights.reply)
            .param("LikeWeight", weights.like)
            .param("ZapWeight", weights.zap)
            .param("Amplification", self.scoring.amplification())
    }

    fn decode_row(&self, row: &Row) -> FeedResult<FeedRow> {
        let post = decode_post(row)?;

        let score = match self.aggregation {
            Aggregation::PushDown => {
                // The type filter lives in the score expression, so the
                // unknown-edge count has to be checked here
                let unknown: i64 = row
                    .get("unknown_engagements")
                    .map_err(|e| malformed_field(&post.id, "unknown_engagements", e))?;
                check_unknown_engagements(&post.id, unknown, self.unknown_engagement)?;

                let score: f64 = row
                    .get("score")
                    .map_err(|e| malformed_field(&post.id, "score", e))?;
                saturate(score)
            }
            Aggregation::InApplication => {
                let engagements: Vec<RawEngagement> = row
                    .get("engagements")
                    .map_err(|e| malformed_field(&post.id, "engagements", e))?;
                self.scoring
                    .score_raw(&post.id, engagements, self.unknown_engagement)?
            }
        };

        Ok(FeedRow { post, score })
    }
}

fn malformed_field(post_id: &str, field: &str, err: impl Display) -> FeedError {
    FeedError::malformed(post_id, format!("{}: {}", field, err))
}

fn decode_post(row: &Row) -> FeedResult<Post> {
    let id: String = row
        .get("id")
        .map_err(|e| malformed_field("<unknown>", "id", e))?;
    let kind: i64 = row.get("kind").map_err(|e| malformed_field(&id, "kind", e))?;
    let kind = u32::try_from(kind)
        .map_err(|_| FeedError::malformed(&id, format!("kind {} out of range", kind)))?;
    let author: String = row
        .get("author")
        .map_err(|e| malformed_field(&id, "author", e))?;
    let created_at: i64 = row
        .get("created_at")
        .map_err(|e| malformed_field(&id, "created_at", e))?;
    let raw: String = row.get("raw").map_err(|e| malformed_field(&id, "raw", e))?;

    Ok(Post {
        id,
        kind,
        author,
        raw,
        created_at,
    })
}

#[async_trait::async_trait]
impl FeedReader for GraphRepository {
    async fn read_feed(&self, request: &FeedRequest) -> FeedResult<Vec<FeedRow>> {
        let mut result = self.graph.execute(self.build_query(request)).await?;

        // Buffer everything first so a failure mid-stream discards the lot
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(self.decode_row(&row)?);
        }

        debug!(
            "Read {} candidate posts for viewer {} ({}, {})",
            rows.len(),
            request.viewer,
            self.aggregation.as_str(),
            self.scoring.strategy()
        );

        Ok(rows)
    }

    async fn health_check(&self) -> FeedResult<()> {
        if !self.ping().await? {
            return Err(FeedError::StorageUnavailable(
                "Neo4j health check failed".to_string(),
            ));
        }
        Ok(())
    }
}
