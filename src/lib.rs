//! A deterministic in-memory substitute for a topic-based message publisher.
//!
//! Production code talks to a [`Publisher`]. In tests, hand it a
//! [`FakePublisher`] instead and assert on what would have been sent to each
//! topic, without any broker, network or serialization involved.

pub mod config;
pub mod error;
pub mod publisher;
mod topic;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

pub use config::{Backend, PublisherConfig};
pub use error::{Error, Result};
pub use publisher::{FakePublisher, Publisher, Scoped, StreamPublisher};
pub use topic::TopicMatcher;

/// Unique identifier for a publisher instance
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublisherId(Uuid);

impl Default for PublisherId {
    fn default() -> Self {
        Self::new()
    }
}

impl PublisherId {
    /// Create a new random publisher ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of the publisher ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

/// Opaque identifier grouping related messages
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic {
    name: String,
}

impl Topic {
    /// Create a new topic
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Get the topic name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self { name }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A message addressed to a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The topic this message targets
    pub topic: Topic,
    /// Optional partitioning key
    pub key: Option<Bytes>,
    /// The message payload, never interpreted by a publisher
    pub payload: Bytes,
    /// Timestamp when the message was created
    pub timestamp: SystemTime,
}

impl Message {
    /// Create a new message
    pub fn new(topic: impl Into<Topic>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            payload: payload.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Attach a partitioning key
    pub fn with_key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Placement reported for a published message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Partition the message landed in
    pub partition: i32,
    /// Offset of the message within its partition
    pub offset: i64,
}

/// Statistics about a [`FakePublisher`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Number of topics with a record, including ones only ever queried
    pub known_topics: usize,
    /// Total number of messages recorded
    pub messages_published: u64,
    /// Number of publish calls that carried no message
    pub absent_publishes: u64,
    /// Number of batch publish calls
    pub batches: u64,
    /// Number of close calls
    pub close_calls: u64,
}
