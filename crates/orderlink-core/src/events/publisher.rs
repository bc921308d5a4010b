//! Publishes domain events to a broker topic.
//!
//! The publisher does not know about transactions. Callers are expected to
//! invoke it only after the mutation an event describes has committed; the
//! storage layer's `EventedTransaction` does exactly that.

use std::sync::Arc;

use tracing::debug;

use super::broker::DynBroker;
use super::error::PublishError;
use super::types::DomainEvent;

/// Default topic for user profile events.
pub const DEFAULT_TOPIC: &str = "user-events";

/// Serializes domain events and hands them to the broker.
#[derive(Clone)]
pub struct EventPublisher {
    broker: DynBroker,
    topic: Arc<str>,
}

impl EventPublisher {
    /// Create a publisher for the given topic.
    pub fn new(broker: DynBroker, topic: impl Into<Arc<str>>) -> Self {
        Self {
            broker,
            topic: topic.into(),
        }
    }

    /// Topic this publisher writes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one event, keyed by its entity id.
    pub async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let payload = event.encode()?;
        let key = event.partition_key();
        self.broker.send(&self.topic, &key, payload).await?;
        debug!(
            topic = %self.topic,
            key = %key,
            kind = %event.kind,
            broker = self.broker.name(),
            "Published domain event"
        );
        Ok(())
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("topic", &self.topic)
            .field("broker", &self.broker.name())
            .finish()
    }
}
