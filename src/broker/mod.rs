//! The `broker` module maps topics to the live connections subscribed to
//! them and fans envelopes out to every subscriber of a topic.

pub mod registry;
pub mod topic;

pub use registry::{BroadcastReport, TopicRegistry};
pub use topic::Topic;
