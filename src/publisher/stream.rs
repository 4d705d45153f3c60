use super::Publisher;
use crate::error::{Error, Result};
use crate::{Delivery, Message, PublisherId, Topic};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// One line of output
#[derive(Serialize)]
struct Entry<'a> {
    topic: &'a Topic,
    key: &'a Option<Bytes>,
    payload: &'a Bytes,
    timestamp: SystemTime,
    partition: i32,
    offset: i64,
}

struct State<W> {
    writer: W,
    offsets: HashMap<Topic, i64>,
    closed: bool,
    /// Set once a write fails, the output may end in a partial line
    failed: bool,
}

/// Publisher that serializes every message as a JSON line into a writer.
///
/// Offsets are assigned per topic starting at 0, everything goes to
/// partition 0. After [`Publisher::close`] the writer is flushed and further
/// publishes fail with [`Error::Closed`]. A failed write may leave a partial
/// line behind, so every publish after it fails with [`Error::Failed`].
pub struct StreamPublisher<W: Write + Send> {
    id: PublisherId,
    state: Mutex<State<W>>,
}

impl<W: Write + Send> StreamPublisher<W> {
    pub fn new(writer: W) -> Self {
        let id = PublisherId::new();
        info!("Creating stream publisher {}", id.as_str());
        Self {
            id,
            state: Mutex::new(State {
                writer,
                offsets: HashMap::new(),
                closed: false,
                failed: false,
            }),
        }
    }

    pub fn id(&self) -> PublisherId {
        self.id
    }

    /// Take the writer back
    pub fn into_inner(self) -> W {
        self.state.into_inner().writer
    }
}

impl<W: Write + Send> Publisher for StreamPublisher<W> {
    fn publish(&self, message: Option<Message>) -> Result<Delivery> {
        let Some(message) = message else {
            return Ok(Delivery::default());
        };

        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::Closed);
        }
        if state.failed {
            return Err(Error::Failed);
        }

        let offset = state.offsets.get(&message.topic).copied().unwrap_or(0);
        let entry = Entry {
            topic: &message.topic,
            key: &message.key,
            payload: &message.payload,
            timestamp: message.timestamp,
            partition: 0,
            offset,
        };
        let mut line =
            serde_json::to_vec(&entry).map_err(|e| Error::Serialization(e.to_string()))?;
        line.push(b'\n');
        if let Err(e) = state.writer.write_all(&line) {
            warn!("Write failed on topic {}, refusing further publishes: {}", message.topic, e);
            state.failed = true;
            return Err(e.into());
        }

        // Only advance once the line made it to the writer
        state.offsets.insert(message.topic.clone(), offset + 1);

        debug!(
            "Wrote message on topic {} at offset {} (size: {} bytes)",
            message.topic,
            offset,
            message.payload.len()
        );

        Ok(Delivery {
            partition: 0,
            offset,
        })
    }

    fn publish_batch(&self, messages: Vec<Option<Message>>) -> Result<()> {
        debug!("Writing batch of {} messages", messages.len());
        for message in messages {
            self.publish(message)?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        info!("Closing stream publisher {}", self.id.as_str());
        state.writer.flush()?;
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io;

    fn lines(publisher: StreamPublisher<Vec<u8>>) -> Vec<Value> {
        let out = publisher.into_inner();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_offsets_are_per_topic() {
        let publisher = StreamPublisher::new(Vec::new());
        let first = publisher.publish(Some(Message::new("orders", "A"))).unwrap();
        let second = publisher.publish(Some(Message::new("orders", "B"))).unwrap();
        let other = publisher
            .publish(Some(Message::new("shipping", "C")))
            .unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
        assert_eq!(other.offset, 0);

        let written = lines(publisher);
        assert_eq!(written.len(), 3);
        assert_eq!(written[1]["topic"], "orders");
        assert_eq!(written[1]["offset"], 1);
        assert_eq!(written[2]["topic"], "shipping");
    }

    #[test]
    fn test_absent_message_writes_nothing() {
        let publisher = StreamPublisher::new(Vec::new());
        assert_eq!(publisher.publish(None).unwrap(), Delivery::default());
        assert!(publisher.into_inner().is_empty());
    }

    #[test]
    fn test_publish_after_close_fails() {
        let publisher = StreamPublisher::new(Vec::new());
        publisher.close().unwrap();
        publisher.close().unwrap();

        let result = publisher.publish(Some(Message::new("orders", "A")));
        assert!(matches!(result, Err(Error::Closed)));
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_batch_stops_at_first_error() {
        let publisher = StreamPublisher::new(BrokenWriter);
        let result = publisher.publish_batch(vec![
            Some(Message::new("orders", "A")),
            Some(Message::new("orders", "B")),
        ]);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    /// Accepts half of the first write, then fails every write after it
    #[derive(Default)]
    struct TornWriter {
        out: Vec<u8>,
        writes: usize,
    }

    impl Write for TornWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes == 1 {
                let half = buf.len() / 2;
                self.out.extend_from_slice(&buf[..half]);
                Ok(half)
            } else {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_torn_write_refuses_later_publishes() {
        let publisher = StreamPublisher::new(TornWriter::default());

        let first = publisher.publish(Some(Message::new("orders", "A")));
        assert!(matches!(first, Err(Error::Io(_))));

        let second = publisher.publish(Some(Message::new("orders", "B")));
        assert!(matches!(second, Err(Error::Failed)));

        // Only the half line from the first attempt, nothing appended to it
        let writer = publisher.into_inner();
        assert_eq!(writer.writes, 2);
        assert!(!writer.out.contains(&b'\n'));
    }

    /// Fails the first flush only
    #[derive(Default)]
    struct FlakyFlush {
        flushes: usize,
    }

    impl Write for FlakyFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            if self.flushes == 1 {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_failed_close_can_be_retried() {
        let publisher = StreamPublisher::new(FlakyFlush::default());
        publisher.publish(Some(Message::new("orders", "A"))).unwrap();

        assert!(matches!(publisher.close(), Err(Error::Io(_))));
        // Still open, the retry flushes again
        publisher.publish(Some(Message::new("orders", "B"))).unwrap();
        publisher.close().unwrap();

        let result = publisher.publish(Some(Message::new("orders", "C")));
        assert!(matches!(result, Err(Error::Closed)));
        assert_eq!(publisher.into_inner().flushes, 2);
    }
}
