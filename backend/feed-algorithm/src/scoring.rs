// ============================================
// Engagement Scoring Model
// ============================================
//
// score(p, viewer) = Σ over engagement edges e targeting p:
//     personalization_weight(author(e), viewer) * type_weight(type(e))
//
// - type_weight: REPLY = 3, LIKE = 2, ZAP = 6
// - personalization_weight: similarity * 420 when the viewer has a SIMILAR
//   edge to the engaging author, 1.0 otherwise
// - every edge counts, including repeats from the same author
//
// The distinct-author strategy (REPLY = 15, LIKE = 10, ZAP = 50, one count
// per author and type, no personalization) is kept as a selectable version.

use crate::domain::{Engagement, EngagementType, RawEngagement};
use crate::error::{FeedError, FeedResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Multiplier applied to the viewer's similarity score for an engaging author
pub const AMPLIFICATION: f64 = 420.0;

/// Weight of an engagement from an author the viewer has no similarity edge to
pub const BASELINE_WEIGHT: f64 = 1.0;

/// Versioned scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    #[default]
    Personalized,
    DistinctAuthor,
}

impl ScoringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringStrategy::Personalized => "personalized",
            ScoringStrategy::DistinctAuthor => "distinct_author",
        }
    }
}

impl fmt::Display for ScoringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personalized" => Ok(ScoringStrategy::Personalized),
            "distinct_author" => Ok(ScoringStrategy::DistinctAuthor),
            other => Err(format!("unknown scoring strategy '{}'", other)),
        }
    }
}

/// What to do with an engagement edge whose type is not REPLY, LIKE or ZAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownEngagementPolicy {
    /// Fail the row as malformed
    #[default]
    Reject,
    /// Skip the edge and log a warning
    Ignore,
}

impl FromStr for UnknownEngagementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(UnknownEngagementPolicy::Reject),
            "ignore" => Ok(UnknownEngagementPolicy::Ignore),
            other => Err(format!("unknown engagement policy '{}'", other)),
        }
    }
}

/// Per-type engagement weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementWeights {
    pub reply: f64,
    pub like: f64,
    pub zap: f64,
}

impl EngagementWeights {
    pub fn personalized() -> Self {
        Self {
            reply: 3.0,
            like: 2.0,
            zap: 6.0,
        }
    }

    pub fn distinct_author() -> Self {
        Self {
            reply: 15.0,
            like: 10.0,
            zap: 50.0,
        }
    }

    pub fn weight(&self, kind: EngagementType) -> f64 {
        match kind {
            EngagementType::Reply => self.reply,
            EngagementType::Like => self.like,
            EngagementType::Zap => self.zap,
        }
    }
}

impl Default for EngagementWeights {
    fn default() -> Self {
        Self::personalized()
    }
}

/// Weight tables plus the aggregation formula
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    strategy: ScoringStrategy,
    weights: EngagementWeights,
    amplification: f64,
}

impl ScoringModel {
    /// Model for the given strategy with its standard weights
    pub fn new(strategy: ScoringStrategy) -> Self {
        let weights = match strategy {
            ScoringStrategy::Personalized => EngagementWeights::personalized(),
            ScoringStrategy::DistinctAuthor => EngagementWeights::distinct_author(),
        };

        Self {
            strategy,
            weights,
            amplification: AMPLIFICATION,
        }
    }

    pub fn personalized() -> Self {
        Self::new(ScoringStrategy::Personalized)
    }

    pub fn distinct_author() -> Self {
        Self::new(ScoringStrategy::DistinctAuthor)
    }

    /// Create with custom weights
    pub fn with_weights(mut self, weights: EngagementWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.strategy
    }

    pub fn weights(&self) -> &EngagementWeights {
        &self.weights
    }

    pub fn amplification(&self) -> f64 {
        self.amplification
    }

    /// Multiplier for an engaging author given the viewer's similarity to them.
    ///
    /// Negative affinities contribute nothing rather than subtracting score.
    /// Huge affinities saturate at `f64::MAX` instead of overflowing.
    pub fn personalization_weight(&self, affinity: Option<f64>) -> f64 {
        match (self.strategy, affinity) {
            (ScoringStrategy::Personalized, Some(similarity)) => {
                saturate(similarity.max(0.0) * self.amplification)
            }
            _ => BASELINE_WEIGHT,
        }
    }

    /// Contribution of a single engagement edge
    pub fn contribution(&self, engagement: &Engagement) -> f64 {
        saturate(
            self.personalization_weight(engagement.affinity) * self.weights.weight(engagement.kind),
        )
    }

    /// Aggregate score for one post's engagements; 0.0 when there are none.
    /// Always finite: the running sum saturates at `f64::MAX`.
    pub fn score(&self, engagements: &[Engagement]) -> f64 {
        match self.strategy {
            ScoringStrategy::Personalized => engagements
                .iter()
                .map(|e| self.contribution(e))
                .fold(0.0, |total, c| saturate(total + c)),
            ScoringStrategy::DistinctAuthor => {
                let distinct: HashSet<(EngagementType, &str)> = engagements
                    .iter()
                    .map(|e| (e.kind, e.author.as_str()))
                    .collect();

                distinct
                    .into_iter()
                    .map(|(kind, _)| self.weights.weight(kind))
                    .fold(0.0, |total, w| saturate(total + w))
            }
        }
    }

    /// Validate a post's raw engagement edges and score them
    pub fn score_raw(
        &self,
        post_id: &str,
        raw: Vec<RawEngagement>,
        policy: UnknownEngagementPolicy,
    ) -> FeedResult<f64> {
        let engagements = resolve_engagements(post_id, raw, policy)?;
        Ok(self.score(&engagements))
    }
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self::personalized()
    }
}

/// Clamp positive overflow to the largest finite score
pub fn saturate(value: f64) -> f64 {
    value.min(f64::MAX)
}

/// Apply `policy` to a count of unrecognized engagement edges reported by
/// the store for one post
pub fn check_unknown_engagements(
    post_id: &str,
    unknown: i64,
    policy: UnknownEngagementPolicy,
) -> FeedResult<()> {
    if unknown <= 0 {
        return Ok(());
    }

    match policy {
        UnknownEngagementPolicy::Reject => Err(FeedError::malformed(
            post_id,
            format!("{} unrecognized engagement edge(s)", unknown),
        )),
        UnknownEngagementPolicy::Ignore => {
            warn!(
                post_id = %post_id,
                unknown,
                "Ignoring unrecognized engagement edges"
            );
            Ok(())
        }
    }
}

/// Turn raw store edges into validated engagements.
///
/// Unknown edge types follow `policy`; a missing author or a non-finite
/// affinity is always a malformed row.
pub fn resolve_engagements(
    post_id: &str,
    raw: Vec<RawEngagement>,
    policy: UnknownEngagementPolicy,
) -> FeedResult<Vec<Engagement>> {
    let mut engagements = Vec::with_capacity(raw.len());

    for edge in raw {
        let Some(kind) = EngagementType::from_label(&edge.edge_type) else {
            match policy {
                UnknownEngagementPolicy::Reject => {
                    return Err(FeedError::malformed(
                        post_id,
                        format!("unrecognized engagement type '{}'", edge.edge_type),
                    ));
                }
                UnknownEngagementPolicy::Ignore => {
                    warn!(
                        post_id = %post_id,
                        edge_type = %edge.edge_type,
                        "Ignoring unrecognized engagement edge"
                    );
                    continue;
                }
            }
        };

        let author = edge.author.ok_or_else(|| {
            FeedError::malformed(post_id, format!("{} edge has no author", kind.as_str()))
        })?;

        if let Some(affinity) = edge.affinity {
            if !affinity.is_finite() {
                return Err(FeedError::malformed(
                    post_id,
                    format!("similarity to {} is not finite", author),
                ));
            }
        }

        engagements.push(Engagement {
            kind,
            author,
            affinity: edge.affinity,
        });
    }

    Ok(engagements)
}
