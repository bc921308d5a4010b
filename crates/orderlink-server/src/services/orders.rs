//! Order operations. Every order is visible only to its owner.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use orderlink_auth::Principal;
use orderlink_storage::{DynStore, Order};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::RecordCache;
use crate::error::ApiError;

/// Create/update payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    /// Defaults to the caller's subject.
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<String>,
    pub total_amount: BigDecimal,
}

#[derive(Clone)]
pub struct OrderService {
    store: DynStore<Order>,
    cache: Arc<RecordCache<Order>>,
}

impl OrderService {
    pub fn new(store: DynStore<Order>, cache: Arc<RecordCache<Order>>) -> Self {
        Self { store, cache }
    }

    pub async fn create(&self, principal: &Principal, input: OrderInput) -> Result<Order, ApiError> {
        validate_amount(&input.total_amount)?;

        let order = Order {
            id: self.store.next_id().await?,
            owner: principal.subject().to_string(),
            customer_name: input
                .customer_name
                .unwrap_or_else(|| principal.subject().to_string()),
            product_ids: input.product_ids,
            total_amount: input.total_amount,
            order_date: OffsetDateTime::now_utc(),
        };
        let saved = self.store.save(&order).await?;
        self.cache.write_through(&saved);
        info!(order_id = %saved.id, owner = %saved.owner, "Order created");
        Ok(saved)
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> Result<Order, ApiError> {
        let order = self
            .cache
            .read_through(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Order {id}")))?;
        ensure_owner(principal, &order)?;
        Ok(order)
    }

    /// Orders owned by the caller, newest first.
    pub async fn list_mine(&self, principal: &Principal) -> Result<Vec<Order>, ApiError> {
        let mut orders = self.store.list_by_owner(principal.subject()).await?;
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        Ok(orders)
    }

    /// Replace the caller's order contents. Owner and order date are kept.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        input: OrderInput,
    ) -> Result<Order, ApiError> {
        validate_amount(&input.total_amount)?;
        let mut order = self.get(principal, id).await?;

        if let Some(name) = input.customer_name {
            order.customer_name = name;
        }
        order.product_ids = input.product_ids;
        order.total_amount = input.total_amount;

        let saved = self.store.save(&order).await?;
        self.cache.write_through(&saved);
        info!(order_id = %saved.id, "Order updated");
        Ok(saved)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ApiError> {
        self.get(principal, id).await?;
        let outcome = self.store.delete_by_id(&id).await?;
        self.cache.evict(&id);
        if !outcome.is_deleted() {
            return Err(ApiError::not_found(format!("Order {id}")));
        }
        info!(order_id = %id, "Order deleted");
        Ok(())
    }
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

fn ensure_owner(principal: &Principal, order: &Order) -> Result<(), ApiError> {
    if principal.owns(&order.owner) {
        return Ok(());
    }
    warn!(
        order_id = %order.id,
        subject = %principal.subject(),
        "Order access denied"
    );
    Err(ApiError::forbidden("You do not have access to this order"))
}

fn validate_amount(amount: &BigDecimal) -> Result<(), ApiError> {
    if amount < &BigDecimal::from(0i64) {
        return Err(ApiError::bad_request("totalAmount must not be negative"));
    }
    Ok(())
}
