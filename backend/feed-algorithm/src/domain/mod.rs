pub mod engagement;
pub mod post;
pub mod request;

pub use engagement::{Engagement, EngagementType, RawEngagement};
pub use post::{FeedEntry, FeedRow, Post};
pub use request::FeedRequest;
