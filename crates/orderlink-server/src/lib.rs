pub mod cache;
pub mod config;
pub mod consumer;
pub mod error;
pub mod fanout;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod services;

pub use cache::{CacheStats, RecordCache};
pub use config::{AppConfig, BrokerConfig, FanoutConfig, LoggingConfig, ServerConfig};
pub use consumer::EventConsumer;
pub use error::ApiError;
pub use fanout::{CompletionHandle, FanoutState, FanoutUpdater, RecordOutcome};
pub use observability::init_tracing;
pub use server::{AppState, OrderlinkServer, ServerBuilder, build_app, build_state};
