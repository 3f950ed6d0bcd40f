mod graph_repository;
mod memory_repository;
mod r#trait;

pub use graph_repository::{Aggregation, GraphRepository};
pub use memory_repository::MemoryGraph;
pub use r#trait::FeedReader;

#[cfg(test)]
pub use r#trait::MockFeedReader;
