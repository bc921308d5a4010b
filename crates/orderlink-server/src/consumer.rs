//! Consumes user events and keeps dependent orders in step.
//!
//! Dispatch is by [`EventKind`]:
//!
//! - `Created`: nothing to do, logged
//! - `Updated`: every order owned by the subject gets `customer_name` set to
//!   the subject name, via the fan-out updater
//! - anything else: logged and dropped
//!
//! Handlers are idempotent upserts, so redelivered events converge on the
//! same state. The consume loop never waits for a fan-out to settle.

use std::sync::Arc;

use orderlink_core::events::{BrokerRecord, DomainEvent, EventKind};
use orderlink_storage::Order;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::fanout::{CompletionHandle, FanoutUpdater};

pub struct EventConsumer {
    orders: Arc<FanoutUpdater<Order>>,
}

impl EventConsumer {
    pub fn new(orders: Arc<FanoutUpdater<Order>>) -> Self {
        Self { orders }
    }

    /// Dispatch one decoded event.
    ///
    /// Returns the fan-out handle when the event started one.
    pub fn on_event(&self, event: &DomainEvent) -> Option<CompletionHandle> {
        match &event.kind {
            EventKind::Created => {
                info!(
                    entity_id = event.entity_id,
                    subject = %event.subject_name,
                    "User created, no order changes needed"
                );
                None
            }
            EventKind::Updated => {
                info!(
                    entity_id = event.entity_id,
                    subject = %event.subject_name,
                    "User updated, refreshing order customer names"
                );
                let name = event.subject_name.clone();
                Some(self.orders.apply_to_all(
                    event.subject_name.clone(),
                    move |order: &mut Order| {
                        order.customer_name.clone_from(&name);
                    },
                ))
            }
            EventKind::Unrecognized(kind) => {
                warn!(
                    kind = %kind,
                    entity_id = event.entity_id,
                    "Unknown event kind, dropped"
                );
                None
            }
        }
    }

    /// Decode and dispatch one broker record. Undecodable payloads are dropped.
    pub fn on_record(&self, record: &BrokerRecord) -> Option<CompletionHandle> {
        match DomainEvent::decode(&record.payload) {
            Ok(event) => self.on_event(&event),
            Err(e) => {
                warn!(
                    topic = %record.topic,
                    key = %record.key,
                    error = %e,
                    "Undecodable event payload, dropped"
                );
                None
            }
        }
    }

    /// Consume records until the channel closes.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<BrokerRecord>) {
        info!("Starting event consumer");

        loop {
            match receiver.recv().await {
                Ok(record) => {
                    debug!(topic = %record.topic, key = %record.key, "Event received");
                    self.on_record(&record);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "Event consumer lagged, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Event channel closed, stopping consumer");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for EventConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventConsumer")
            .field("orders", &self.orders)
            .finish()
    }
}
