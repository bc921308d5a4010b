//! Error types for event encoding, brokering and publishing.

/// Failure to encode or decode a [`DomainEvent`](super::DomainEvent).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Event encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Event decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Errors raised by an [`EventBroker`](super::EventBroker).
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The broker no longer accepts records.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// The topic name is not usable.
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),
}

impl BrokerError {
    /// Create an unavailable error from a string.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        BrokerError::Unavailable(msg.into())
    }
}

/// Errors raised while publishing a domain event.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}
