#![allow(dead_code)]

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use jsonwebtoken::{EncodingKey, Header, encode};
use orderlink_db_memory::InMemoryStore;
use orderlink_server::AppConfig;
use orderlink_storage::{DeleteOutcome, Order, Record, RecordStore, StorageError, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.secret = SECRET.into();
    cfg.fanout.discovery_threads = 1;
    cfg.fanout.apply_threads = 2;
    cfg
}

/// Signed HS256 bearer token for `subject`, valid for an hour.
pub fn token(subject: &str) -> String {
    let claims = serde_json::json!({
        "sub": subject,
        "exp": OffsetDateTime::now_utc().unix_timestamp() + 3600,
        "auth": "ROLE_USER",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn order(owner: &str, customer_name: &str) -> Order {
    Order {
        id: Uuid::new_v4(),
        owner: owner.into(),
        customer_name: customer_name.into(),
        product_ids: vec!["sku-1".into()],
        total_amount: BigDecimal::from_str("10.00").unwrap(),
        order_date: OffsetDateTime::now_utc(),
    }
}

/// In-memory store that can be told to fail chosen saves or all owner scans,
/// or to delete a record right after an owner scan has listed it.
pub struct FlakyStore<R: Record> {
    inner: InMemoryStore<R>,
    failing_saves: Mutex<HashSet<R::Id>>,
    fail_discovery: AtomicBool,
    delete_after_scan: Mutex<Option<R::Id>>,
}

impl<R: Record> FlakyStore<R> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStore::new(),
            failing_saves: Mutex::new(HashSet::new()),
            fail_discovery: AtomicBool::new(false),
            delete_after_scan: Mutex::new(None),
        })
    }

    pub fn fail_save_of(&self, id: R::Id) {
        self.failing_saves.lock().unwrap().insert(id);
    }

    pub fn fail_discovery(&self) {
        self.fail_discovery.store(true, Ordering::SeqCst);
    }

    pub fn delete_after_scan(&self, id: R::Id) {
        *self.delete_after_scan.lock().unwrap() = Some(id);
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for FlakyStore<R> {
    async fn get_by_id(&self, id: &R::Id) -> Result<Option<R>, StorageError> {
        self.inner.get_by_id(id).await
    }
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<R>, StorageError> {
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("scan timed out"));
        }
        let listed = self.inner.list_by_owner(owner).await?;
        let doomed = self.delete_after_scan.lock().unwrap().take();
        if let Some(id) = doomed {
            self.inner.delete_by_id(&id).await?;
        }
        Ok(listed)
    }
    async fn list_all(&self) -> Result<Vec<R>, StorageError> {
        self.inner.list_all().await
    }
    async fn save(&self, record: &R) -> Result<R, StorageError> {
        if self.failing_saves.lock().unwrap().contains(record.id()) {
            return Err(StorageError::connection_error("write rejected"));
        }
        self.inner.save(record).await
    }
    async fn delete_by_id(&self, id: &R::Id) -> Result<DeleteOutcome, StorageError> {
        self.inner.delete_by_id(id).await
    }
    async fn next_id(&self) -> Result<R::Id, StorageError> {
        self.inner.next_id().await
    }
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction<R>>, StorageError> {
        self.inner.begin_transaction().await
    }
    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
