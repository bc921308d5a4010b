//! Domain event infrastructure shared by the user and order sides.
//!
//! # Architecture
//!
//! ```text
//!  user mutation ──commit──▶ EventPublisher ──▶ EventBroker (topic, key = id)
//!                                                      │
//!                                                      ▼
//!                                               EventConsumer
//! ```
//!
//! # Module Structure
//!
//! - [`types`]: `DomainEvent`, `EventKind` and the JSON wire codec
//! - [`broker`]: broker contract and the in-process broadcast broker
//! - [`publisher`]: keyed publishing onto a topic
//! - [`error`]: codec, broker and publish errors

pub mod broker;
pub mod error;
pub mod publisher;
pub mod types;

// Re-export main types for convenience
pub use broker::{BrokerRecord, DynBroker, EventBroker, InProcessBroker};
pub use error::{BrokerError, CodecError, PublishError};
pub use publisher::{DEFAULT_TOPIC, EventPublisher};
pub use types::{DomainEvent, EventKind};
