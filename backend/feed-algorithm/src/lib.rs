pub mod assembler;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod repository;
pub mod scoring;

pub use assembler::FeedAssembler;
pub use config::Config;
pub use domain::{Engagement, EngagementType, FeedEntry, FeedRequest, FeedRow, Post};
pub use engine::Engine;
pub use error::{FeedError, FeedResult};
pub use repository::{Aggregation, FeedReader, GraphRepository, MemoryGraph};
pub use scoring::{EngagementWeights, ScoringModel, ScoringStrategy, UnknownEngagementPolicy};
