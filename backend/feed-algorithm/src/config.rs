use crate::error::{FeedError, FeedResult};
use crate::repository::Aggregation;
use crate::scoring::{ScoringStrategy, UnknownEngagementPolicy};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Neo4j connection configuration, from NEO4J_* env vars
    pub neo4j: Neo4jConfig,
    /// Feed query behaviour, from FEED_* env vars
    pub feed: FeedConfig,
}

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Neo4j bolt URI, e.g. bolt://neo4j:7687
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Deadline for the storage round trip
    pub query_timeout: Duration,
    /// Requested limits above this are rejected; unset means no cap
    pub max_limit: Option<usize>,
    pub scoring_strategy: ScoringStrategy,
    pub aggregation: Aggregation,
    pub unknown_engagement: UnknownEngagementPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(5_000),
            max_limit: None,
            scoring_strategy: ScoringStrategy::default(),
            aggregation: Aggregation::default(),
            unknown_engagement: UnknownEngagementPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> FeedResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults so the
    /// engine can still start (and fail health checks) without a full env.
    pub fn from_lookup<F>(lookup: F) -> FeedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let neo4j = Neo4jConfig {
            uri: lookup("NEO4J_URI").unwrap_or_else(|| "bolt://neo4j:7687".to_string()),
            user: lookup("NEO4J_USER").unwrap_or_else(|| "neo4j".to_string()),
            password: lookup("NEO4J_PASSWORD").unwrap_or_else(|| "CHANGE_ME".to_string()),
        };

        let defaults = FeedConfig::default();
        let timeout_ms: u64 = parse_or(
            &lookup,
            "FEED_QUERY_TIMEOUT_MS",
            defaults.query_timeout.as_millis() as u64,
        )?;
        let max_limit: Option<usize> = parse_optional(&lookup, "FEED_MAX_LIMIT")?;

        if timeout_ms == 0 {
            return Err(FeedError::Config(
                "FEED_QUERY_TIMEOUT_MS must be positive".to_string(),
            ));
        }
        if max_limit == Some(0) {
            return Err(FeedError::Config("FEED_MAX_LIMIT must be positive".to_string()));
        }

        let feed = FeedConfig {
            query_timeout: Duration::from_millis(timeout_ms),
            max_limit: max_limit.or(defaults.max_limit),
            scoring_strategy: parse_or(
                &lookup,
                "FEED_SCORING_STRATEGY",
                defaults.scoring_strategy,
            )?,
            aggregation: parse_or(&lookup, "FEED_AGGREGATION", defaults.aggregation)?,
            unknown_engagement: parse_or(
                &lookup,
                "FEED_UNKNOWN_ENGAGEMENT",
                defaults.unknown_engagement,
            )?,
        };

        Ok(Self { neo4j, feed })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> FeedResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

/// `None` when the key is unset or blank
fn parse_optional<F, T>(lookup: &F, key: &str) -> FeedResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| FeedError::Config(format!("{} is invalid: {}", key, e))),
        _ => Ok(None),
    }
}
