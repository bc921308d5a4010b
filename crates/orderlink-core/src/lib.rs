pub mod events;
pub mod pool;

pub use events::{
    BrokerError, BrokerRecord, CodecError, DEFAULT_TOPIC, DomainEvent, DynBroker, EventBroker,
    EventKind, EventPublisher, InProcessBroker, PublishError,
};
pub use pool::WorkerPool;
