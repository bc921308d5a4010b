//! Entity types stored by orderlink.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::traits::Record;

// ============================================================================
// User
// ============================================================================

/// Postal address, persisted together with its user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

/// A registered user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized into responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub address: Address,
}

impl Record for User {
    type Id = i64;
    const KIND: &'static str = "User";

    fn id(&self) -> &i64 {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.username
    }

    fn unique_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("username", self.username.clone()),
            ("email", self.email.clone()),
        ]
    }
}

// ============================================================================
// Order
// ============================================================================

/// An order placed by a user.
///
/// `owner` is the username of the principal that created the order and is
/// the subject key for fan-out; `customer_name` is the denormalized copy of
/// the owner's name that upstream profile changes propagate into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[serde(rename = "username")]
    pub owner: String,
    pub customer_name: String,
    #[serde(default)]
    pub product_ids: Vec<String>,
    pub total_amount: BigDecimal,
    #[serde(with = "time::serde::rfc3339")]
    pub order_date: OffsetDateTime,
}

impl Record for Order {
    type Id = Uuid;
    const KIND: &'static str = "Order";

    fn id(&self) -> &Uuid {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.owner
    }
}
