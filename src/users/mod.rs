//! User persistence
//!
//! The auth engine reaches user records only through [`UserStore`]; the
//! in-memory backend serves tests and database-less development, the
//! PostgreSQL backend serves deployments.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{AuthMethod, AuthMethodEntry, User};

mod memory;
mod postgres;
mod registration;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;
pub use registration::{RegistrationRequest, RegistrationService};

/// Result of [`UserStore::attach_method`]
#[derive(Debug)]
pub enum AttachOutcome {
    /// The user now holds the entry (possibly already did)
    Attached(User),
    /// Another user owns the entry
    Taken,
    UserMissing,
}

/// User record backend
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the user owning the `(method, token)` pair
    async fn find_by_auth_method(
        &self,
        method: AuthMethod,
        token: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Create a user; fails with [`StoreError::Conflict`] if any of its
    /// auth methods is owned by someone else
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    /// Replace the auth method list of a user
    async fn set_auth_methods(
        &self,
        id: Uuid,
        methods: &[AuthMethodEntry],
    ) -> Result<(), StoreError>;

    /// Add `entry` to a user unless another user owns it
    ///
    /// The ownership check and the write happen as one atomic step.
    async fn attach_method(
        &self,
        id: Uuid,
        entry: &AuthMethodEntry,
    ) -> Result<AttachOutcome, StoreError>;

    async fn set_refresh_token_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError>;

    /// Swap the refresh token hash only if it still equals `current`
    async fn replace_refresh_token_hash(
        &self,
        id: Uuid,
        current: &str,
        new: &str,
    ) -> Result<bool, StoreError>;
}

/// Remove every entry of `method` from a user's auth methods
///
/// Returns `false` when the user does not exist.
pub async fn unattach_method(
    store: &dyn UserStore,
    user_id: Uuid,
    method: AuthMethod,
) -> Result<bool, StoreError> {
    let Some(user) = store.find_by_id(user_id).await? else {
        return Ok(false);
    };

    let remaining: Vec<AuthMethodEntry> = user
        .auth_methods
        .into_iter()
        .filter(|entry| entry.method != method)
        .collect();

    store.set_auth_methods(user_id, &remaining).await?;

    tracing::info!(user_id = %user_id, method = %method, "Auth method detached");

    Ok(true)
}
