//! User profile operations.
//!
//! Every mutation runs in an [`EventedTransaction`], so `Created`/`Updated`
//! events reach the broker only after the store commit. The cache is touched
//! only after the store call succeeded.

use std::sync::Arc;

use orderlink_auth::{Principal, password};
use orderlink_core::events::{DomainEvent, EventPublisher};
use orderlink_storage::{Address, DynStore, EventedTransaction, User};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::RecordCache;
use crate::error::ApiError;

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: Address,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Required with `password`; must match the stored hash.
    pub current_password: Option<String>,
    pub address: Option<Address>,
}

#[derive(Clone)]
pub struct UserService {
    store: DynStore<User>,
    cache: Arc<RecordCache<User>>,
    publisher: EventPublisher,
}

impl UserService {
    pub fn new(
        store: DynStore<User>,
        cache: Arc<RecordCache<User>>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
        }
    }

    pub async fn register(&self, new_user: NewUser) -> Result<User, ApiError> {
        validate_username(&new_user.username)?;
        validate_email(&new_user.email)?;
        validate_password(&new_user.password)?;

        let user = User {
            id: self.store.next_id().await?,
            username: new_user.username,
            email: new_user.email,
            password_hash: hash_blocking(new_user.password).await?,
            address: new_user.address,
        };

        let mut tx = EventedTransaction::begin(self.store.as_ref(), self.publisher.clone()).await?;
        let saved = match tx.save(&user).await {
            Ok(saved) => saved,
            Err(e) => {
                tx.rollback().await?;
                return Err(e.into());
            }
        };
        tx.queue_event(DomainEvent::created(
            saved.id,
            &saved.username,
            &saved.email,
        ));
        tx.commit().await?;

        self.cache.write_through(&saved);
        info!(user_id = saved.id, username = %saved.username, "User registered");
        Ok(saved)
    }

    pub async fn get(&self, id: i64) -> Result<User, ApiError> {
        self.cache
            .read_through(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {id}")))
    }

    /// One-line plain-text summary of a profile.
    pub async fn report(&self, id: i64) -> Result<String, ApiError> {
        info!(user_id = id, "Generating report");
        let user = self.get(id).await?;
        Ok(format!("Report for {} ({})", user.username, user.email))
    }

    /// All users, ordered by id.
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        let mut users = self.store.list_all().await?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    /// Apply `changes` to the caller's own profile.
    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        changes: UserChanges,
    ) -> Result<User, ApiError> {
        let mut tx = EventedTransaction::begin(self.store.as_ref(), self.publisher.clone()).await?;

        let Some(mut user) = tx.get(&id).await? else {
            tx.rollback().await?;
            return Err(ApiError::not_found(format!("User {id}")));
        };
        if !principal.owns(&user.username) {
            tx.rollback().await?;
            warn!(user_id = id, subject = %principal.subject(), "Profile update denied");
            return Err(ApiError::forbidden("You can only modify your own profile"));
        }

        if let Err(e) = apply_changes(&mut user, changes).await {
            tx.rollback().await?;
            return Err(e);
        }

        let saved = match tx.save(&user).await {
            Ok(saved) => saved,
            Err(e) => {
                tx.rollback().await?;
                return Err(e.into());
            }
        };
        tx.queue_event(DomainEvent::updated(
            saved.id,
            &saved.username,
            &saved.email,
        ));
        let report = tx.commit().await?;

        self.cache.write_through(&saved);
        debug!(
            user_id = saved.id,
            published = report.published,
            failed = report.failed,
            "User updated"
        );
        Ok(saved)
    }

    /// Delete the caller's own profile.
    pub async fn delete(&self, principal: &Principal, id: i64) -> Result<(), ApiError> {
        let user = self.get(id).await?;
        if !principal.owns(&user.username) {
            warn!(user_id = id, subject = %principal.subject(), "Profile delete denied");
            return Err(ApiError::forbidden("You can only delete your own profile"));
        }

        if !self.store.delete_by_id(&id).await?.is_deleted() {
            // Deleted concurrently; make sure no stale copy survives.
            self.cache.evict(&id);
            return Err(ApiError::not_found(format!("User {id}")));
        }
        self.cache.evict(&id);
        info!(user_id = id, "User deleted");
        Ok(())
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService")
            .field("backend", &self.store.backend_name())
            .field("topic", &self.publisher.topic())
            .finish()
    }
}

async fn apply_changes(user: &mut User, changes: UserChanges) -> Result<(), ApiError> {
    if let Some(username) = changes.username {
        validate_username(&username)?;
        user.username = username;
    }
    if let Some(email) = changes.email {
        validate_email(&email)?;
        user.email = email;
    }
    if let Some(password) = changes.password {
        validate_password(&password)?;
        let Some(current) = changes.current_password else {
            return Err(ApiError::bad_request(
                "currentPassword is required to change the password",
            ));
        };
        if !verify_blocking(current, user.password_hash.clone()).await? {
            return Err(ApiError::forbidden("current password does not match"));
        }
        user.password_hash = hash_blocking(password).await?;
    }
    if let Some(address) = changes.address {
        user.address = address;
    }
    Ok(())
}

// Argon2 is CPU-bound and must stay off the async workers.

async fn hash_blocking(plain: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn verify_blocking(plain: String, stored_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored_hash))
        .await
        .map_err(|e| ApiError::internal(format!("password check task failed: {e}")))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::bad_request("username must not be blank"));
    }
    if username.contains(',') || username.chars().any(char::is_whitespace) {
        return Err(ApiError::bad_request(
            "username must not contain whitespace or commas",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::bad_request(format!("invalid email: {email}"))),
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}
