use super::Publisher;
use crate::error::Result;
use crate::topic::TopicMatcher;
use crate::{Delivery, Message, PublisherId, PublisherStats, Topic};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Statistics counters for the fake publisher
#[derive(Default)]
struct Counters {
    messages_published: AtomicU64,
    absent_publishes: AtomicU64,
    batches: AtomicU64,
    close_calls: AtomicU64,
}

struct Record {
    seq: u64,
    message: Message,
}

/// Append-only per-topic record of everything published.
#[derive(Default)]
struct PublishLog {
    topics: HashMap<Topic, Vec<Record>>,
    /// Topics in the order they were first seen
    order: Vec<Topic>,
    next_seq: u64,
}

impl PublishLog {
    fn entry(&mut self, topic: &Topic) -> &mut Vec<Record> {
        if !self.topics.contains_key(topic) {
            self.order.push(topic.clone());
        }
        self.topics.entry(topic.clone()).or_default()
    }

    fn append(&mut self, message: Message) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let topic = message.topic.clone();
        self.entry(&topic).push(Record { seq, message });
    }
}

/// In-memory stand-in for a topic publisher.
///
/// Every published message is recorded under its topic and can be read back
/// with [`FakePublisher::get_messages`]. Nothing is sent anywhere, nothing
/// fails, and the reported partition and offset are always `0`.
///
/// Reads return snapshots: a `Vec` handed out earlier never changes when more
/// messages are published afterwards.
pub struct FakePublisher {
    id: PublisherId,
    log: Mutex<PublishLog>,
    counters: Counters,
}

impl Default for FakePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePublisher {
    /// Create a publisher with an empty log
    pub fn new() -> Self {
        let id = PublisherId::new();
        info!("Creating fake publisher {}", id.as_str());
        Self {
            id,
            log: Mutex::new(PublishLog::default()),
            counters: Counters::default(),
        }
    }

    pub fn id(&self) -> PublisherId {
        self.id
    }

    /// Messages published to `topic`, in publish order.
    ///
    /// Querying a topic nobody published to records it as known with an
    /// empty sequence; later publishes to it append to that same record.
    pub fn get_messages(&self, topic: impl Into<Topic>) -> Vec<Message> {
        let topic = topic.into();
        let mut log = self.log.lock();
        log.entry(&topic)
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }

    /// Whether `topic` has a record, without creating one
    pub fn has_topic(&self, topic: impl Into<Topic>) -> bool {
        self.log.lock().topics.contains_key(&topic.into())
    }

    /// Known topics in first-seen order
    pub fn topics(&self) -> Vec<Topic> {
        self.log.lock().order.clone()
    }

    /// Total number of recorded messages across all topics
    pub fn message_count(&self) -> usize {
        self.log.lock().topics.values().map(Vec::len).sum()
    }

    /// Every recorded message whose topic matches `pattern`, in global publish order.
    ///
    /// Topics are compared segment by segment, empty segments included.
    pub fn messages_matching(&self, pattern: &str) -> Vec<Message> {
        let matcher = TopicMatcher::new(pattern);
        let log = self.log.lock();
        let mut records: Vec<&Record> = log
            .topics
            .iter()
            .filter(|(topic, _)| matcher.matches(topic.name()))
            .flat_map(|(_, records)| records.iter())
            .collect();
        records.sort_by_key(|record| record.seq);
        records
            .into_iter()
            .map(|record| record.message.clone())
            .collect()
    }

    pub fn stats(&self) -> PublisherStats {
        let known_topics = self.log.lock().topics.len();

        PublisherStats {
            known_topics,
            messages_published: self.counters.messages_published.load(Ordering::Relaxed),
            absent_publishes: self.counters.absent_publishes.load(Ordering::Relaxed),
            batches: self.counters.batches.load(Ordering::Relaxed),
            close_calls: self.counters.close_calls.load(Ordering::Relaxed),
        }
    }
}

impl Publisher for FakePublisher {
    fn publish(&self, message: Option<Message>) -> Result<Delivery> {
        let Some(message) = message else {
            debug!("Publisher {} got an absent message, nothing to record", self.id.as_str());
            self.counters.absent_publishes.fetch_add(1, Ordering::Relaxed);
            return Ok(Delivery::default());
        };

        debug!(
            "Recording message on topic {} (size: {} bytes)",
            message.topic,
            message.payload.len()
        );
        self.log.lock().append(message);
        self.counters.messages_published.fetch_add(1, Ordering::Relaxed);

        Ok(Delivery::default())
    }

    fn publish_batch(&self, messages: Vec<Option<Message>>) -> Result<()> {
        debug!("Recording batch of {} messages", messages.len());
        self.counters.batches.fetch_add(1, Ordering::Relaxed);
        for message in messages {
            self.publish(message)?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        info!("Closing fake publisher {}", self.id.as_str());
        self.counters.close_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
