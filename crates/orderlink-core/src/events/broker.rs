//! Broker contract and the in-process broker.
//!
//! The broker is a keyed, topic-based channel. Records sharing a key are
//! delivered in send order; nothing is promised across keys or topics.
//! [`InProcessBroker`] keeps one tokio broadcast channel per topic, so every
//! subscriber sees every record sent after it subscribed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use super::error::BrokerError;

/// Default buffer size for each topic channel.
/// Records beyond this limit are dropped for slow receivers, who observe a lag.
const DEFAULT_TOPIC_CAPACITY: usize = 1024;

/// One record on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRecord {
    pub topic: String,
    /// Partition key; ordering holds per key.
    pub key: String,
    pub payload: Vec<u8>,
}

/// Outbound side of a message broker.
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Hand a record to the broker.
    ///
    /// `Ok` means the broker accepted the record, not that anyone consumed it.
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BrokerError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Shared broker handle.
pub type DynBroker = Arc<dyn EventBroker>;

/// Broker backed by in-process broadcast channels.
pub struct InProcessBroker {
    topics: DashMap<String, broadcast::Sender<BrokerRecord>>,
    capacity: usize,
    closed: AtomicBool,
}

impl InProcessBroker {
    /// Create a broker with the default per-topic buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Create a broker with a custom per-topic buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a new broker wrapped in an Arc for sharing.
    pub fn new_shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::with_capacity(capacity))
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BrokerRecord> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to a topic.
    ///
    /// Only records sent after subscription are received.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<BrokerRecord> {
        self.sender(topic).subscribe()
    }

    /// Number of active subscribers on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or_default()
    }

    /// Stop accepting records. Subsequent sends fail with [`BrokerError::Unavailable`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.topics.clear();
    }

    /// Returns `true` once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for InProcessBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBroker for InProcessBroker {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::unavailable("in-process broker is closed"));
        }
        if topic.is_empty() {
            return Err(BrokerError::InvalidTopic(topic.to_string()));
        }

        let record = BrokerRecord {
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
        };
        // No subscribers is not an error: the record is simply not retained.
        let delivered = self.sender(topic).send(record).unwrap_or_default();
        debug!(topic = %topic, key = %key, subscribers = delivered, "Broker record sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

impl std::fmt::Debug for InProcessBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessBroker")
            .field("topics", &self.topics.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
