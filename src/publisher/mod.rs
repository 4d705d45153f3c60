mod memory;
mod stream;

use crate::error::Result;
use crate::{Delivery, Message};
use std::ops::Deref;
use std::sync::Arc;
use tracing::warn;

pub use memory::FakePublisher;
pub use stream::StreamPublisher;

/// Capability set shared by every publisher implementation.
///
/// Call sites depend on this trait only, so a real publisher and
/// [`FakePublisher`] are interchangeable when the publisher is constructed.
/// A `None` message is the "nothing to send" case and succeeds without
/// recording or sending anything.
pub trait Publisher: Send + Sync {
    /// Publish a single message, reporting where it landed
    fn publish(&self, message: Option<Message>) -> Result<Delivery>;

    /// Publish messages in input order
    fn publish_batch(&self, messages: Vec<Option<Message>>) -> Result<()>;

    /// Release whatever the publisher holds
    fn close(&self) -> Result<()>;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&self, message: Option<Message>) -> Result<Delivery> {
        (**self).publish(message)
    }

    fn publish_batch(&self, messages: Vec<Option<Message>>) -> Result<()> {
        (**self).publish_batch(messages)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, message: Option<Message>) -> Result<Delivery> {
        (**self).publish(message)
    }

    fn publish_batch(&self, messages: Vec<Option<Message>>) -> Result<()> {
        (**self).publish_batch(messages)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// Owns a publisher and closes it exactly once, on every exit path.
pub struct Scoped<P: Publisher> {
    inner: Option<P>,
}

impl<P: Publisher> Scoped<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// Close now and surface the result instead of logging it on drop
    pub fn close(mut self) -> Result<()> {
        match self.inner.take() {
            Some(publisher) => publisher.close(),
            None => Ok(()),
        }
    }

    /// Give the publisher back without closing it
    pub fn into_inner(mut self) -> P {
        // `inner` is only emptied by close/into_inner, both of which consume self
        match self.inner.take() {
            Some(publisher) => publisher,
            None => unreachable!("scoped publisher already released"),
        }
    }
}

impl<P: Publisher> Deref for Scoped<P> {
    type Target = P;

    fn deref(&self) -> &P {
        match &self.inner {
            Some(publisher) => publisher,
            None => unreachable!("scoped publisher already released"),
        }
    }
}

impl<P: Publisher> Drop for Scoped<P> {
    fn drop(&mut self) {
        if let Some(publisher) = self.inner.take() {
            if let Err(e) = publisher.close() {
                warn!("Failed to close publisher on scope exit: {}", e);
            }
        }
    }
}
