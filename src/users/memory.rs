//! In-memory user store

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{AuthMethod, AuthMethodEntry, User};

use super::{AttachOutcome, UserStore};

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_auth_method(
        &self,
        method: AuthMethod,
        token: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.has_auth_method(method, token))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;

        let taken = user.auth_methods.iter().any(|entry| {
            users
                .values()
                .any(|other| other.id != user.id && other.has_auth_method(entry.method, &entry.token))
        });
        if taken {
            return Err(StoreError::Conflict("auth method already owned".to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_auth_methods(
        &self,
        id: Uuid,
        methods: &[AuthMethodEntry],
    ) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.auth_methods = methods.to_vec();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn attach_method(
        &self,
        id: Uuid,
        entry: &AuthMethodEntry,
    ) -> Result<AttachOutcome, StoreError> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|other| other.id != id && other.has_auth_method(entry.method, &entry.token))
        {
            return Ok(AttachOutcome::Taken);
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(AttachOutcome::UserMissing);
        };

        if !user.auth_methods.contains(entry) {
            user.auth_methods.push(entry.clone());
            user.updated_at = Utc::now();
        }

        Ok(AttachOutcome::Attached(user.clone()))
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: &str) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.refresh_token_hash = Some(hash.to_string());
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn replace_refresh_token_hash(
        &self,
        id: Uuid,
        current: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;

        match users.get_mut(&id) {
            Some(user) if user.refresh_token_hash.as_deref() == Some(current) => {
                user.refresh_token_hash = Some(new.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(token: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            auth_methods: vec![AuthMethodEntry::new(AuthMethod::Solana, token)],
            referred_by: None,
            experience: 0,
            refresh_token_hash: Some("h1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_owned_method() {
        let store = MemoryUserStore::new();
        store.insert(&user_with("Addr1")).await.unwrap();

        assert!(matches!(
            store.insert(&user_with("Addr1")).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_attach_has_single_winner() {
        let store = MemoryUserStore::new();
        let alice = user_with("AliceAddr");
        let bob = user_with("BobAddr");
        store.insert(&alice).await.unwrap();
        store.insert(&bob).await.unwrap();

        let entry = AuthMethodEntry::new(AuthMethod::Solana, "SharedAddr");
        let (a, b) = tokio::join!(
            store.attach_method(alice.id, &entry),
            store.attach_method(bob.id, &entry)
        );

        let attached = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter(|outcome| matches!(outcome, AttachOutcome::Attached(_)))
            .count();
        assert_eq!(attached, 1);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent_and_checks_user() {
        let store = MemoryUserStore::new();
        let alice = user_with("AliceAddr");
        store.insert(&alice).await.unwrap();

        let entry = AuthMethodEntry::new(AuthMethod::Solana, "AliceAddr");
        match store.attach_method(alice.id, &entry).await.unwrap() {
            AttachOutcome::Attached(user) => assert_eq!(user.auth_methods.len(), 1),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            store.attach_method(Uuid::new_v4(), &entry).await.unwrap(),
            AttachOutcome::Taken
        ));

        let fresh = AuthMethodEntry::new(AuthMethod::Solana, "Unowned");
        assert!(matches!(
            store.attach_method(Uuid::new_v4(), &fresh).await.unwrap(),
            AttachOutcome::UserMissing
        ));
    }

    #[tokio::test]
    async fn test_replace_refresh_token_hash_compares() {
        let store = MemoryUserStore::new();
        let user = user_with("Addr1");
        store.insert(&user).await.unwrap();

        assert!(store.replace_refresh_token_hash(user.id, "h1", "h2").await.unwrap());
        assert!(!store.replace_refresh_token_hash(user.id, "h1", "h3").await.unwrap());

        let reloaded = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.refresh_token_hash.as_deref(), Some("h2"));
    }
}
