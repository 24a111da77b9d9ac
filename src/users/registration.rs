//! Account registration

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{AuthMethod, AuthMethodEntry, User, UserView};

use super::UserStore;

/// Everything needed to open an account under an auth method
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub method: AuthMethod,
    pub token: String,
    pub referral_code: Option<String>,
    pub onboarding_exp_bonus: Option<i64>,
}

/// Creates accounts for first-time wallet logins
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn UserStore>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, request: RegistrationRequest) -> Result<UserView, StoreError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            auth_methods: vec![AuthMethodEntry::new(request.method, request.token)],
            referred_by: request.referral_code,
            experience: request.onboarding_exp_bonus.unwrap_or(0).max(0),
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&user).await?;

        tracing::info!(
            user_id = %user.id,
            method = %request.method,
            referred = user.referred_by.is_some(),
            "User registered"
        );

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::MemoryUserStore;

    #[tokio::test]
    async fn test_register_applies_referral_and_bonus() {
        let store = MemoryUserStore::new();
        let service = RegistrationService::new(Arc::new(store.clone()));

        let view = service
            .register(RegistrationRequest {
                method: AuthMethod::Solana,
                token: "Addr1".to_string(),
                referral_code: Some("FRIEND".to_string()),
                onboarding_exp_bonus: Some(25),
            })
            .await
            .unwrap();

        assert_eq!(view.referred_by.as_deref(), Some("FRIEND"));
        assert_eq!(view.experience, 25);
        assert_eq!(
            view.auth_methods,
            vec![AuthMethodEntry::new(AuthMethod::Solana, "Addr1")]
        );

        let stored = store
            .find_by_auth_method(AuthMethod::Solana, "Addr1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, view.id);
    }

    #[tokio::test]
    async fn test_register_without_bonus() {
        let service = RegistrationService::new(Arc::new(MemoryUserStore::new()));
        let view = service
            .register(RegistrationRequest {
                method: AuthMethod::Solana,
                token: "Addr2".to_string(),
                referral_code: None,
                onboarding_exp_bonus: None,
            })
            .await
            .unwrap();

        assert_eq!(view.experience, 0);
        assert!(view.referred_by.is_none());
    }
}
