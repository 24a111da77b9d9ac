//! Auth engines
//!
//! Each supported [`AuthMethod`] has an engine implementing [`AuthEngine`];
//! [`AuthEngines`] dispatches on the method tag.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AttachData, AuthMethod, AuthMethodEntry, LoginData, LoginOutcome, SignupData, User, UserView,
};
use crate::users::{
    unattach_method, AttachOutcome, RegistrationRequest, RegistrationService, UserStore,
};

use super::challenge::ChallengeGenerator;
use super::error::AuthError;
use super::jwt::TokenService;
use super::nonce::NonceLedger;
use super::verifier::SignatureVerifier;

const LOOKUP_ATTEMPTS: u32 = 3;
const LOOKUP_BACKOFF: Duration = Duration::from_millis(50);

/// Login/signup/attach lifecycle of one authentication method
#[async_trait]
pub trait AuthEngine: Send + Sync {
    fn method(&self) -> AuthMethod;

    /// Issue a challenge message for `public_key` to sign
    async fn generate_challenge(&self, public_key: &str) -> Result<String, AuthError>;

    /// Verify the signed challenge, creating the account on first use
    async fn login(&self, data: LoginData) -> Result<LoginOutcome, AuthError>;

    async fn signup(&self, data: SignupData) -> Result<UserView, AuthError>;

    /// Add this method to an existing account and log in with it
    async fn attach(&self, user_id: Uuid, data: AttachData) -> Result<LoginOutcome, AuthError>;

    async fn unattach(&self, user_id: Uuid) -> Result<(), AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;
}

/// Engine registry keyed by method tag
#[derive(Clone)]
pub struct AuthEngines {
    solana: Arc<dyn AuthEngine>,
}

impl AuthEngines {
    pub fn new(solana: Arc<dyn AuthEngine>) -> Self {
        Self { solana }
    }

    pub fn engine(&self, method: AuthMethod) -> Arc<dyn AuthEngine> {
        match method {
            AuthMethod::Solana => self.solana.clone(),
        }
    }

    /// Every registered engine
    pub fn all(&self) -> Vec<Arc<dyn AuthEngine>> {
        vec![self.solana.clone()]
    }
}

/// Solana wallet sign-in
pub struct SolanaAuthEngine {
    users: Arc<dyn UserStore>,
    registration: RegistrationService,
    tokens: Arc<TokenService>,
    challenges: ChallengeGenerator,
    verifier: SignatureVerifier,
}

impl SolanaAuthEngine {
    pub fn new(
        ledger: Arc<NonceLedger>,
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            registration: RegistrationService::new(users.clone()),
            users,
            tokens,
            challenges: ChallengeGenerator::new(ledger.clone(), app_name),
            verifier: SignatureVerifier::new(ledger),
        }
    }

    /// Look up the owner of a public key
    ///
    /// Store failures are retried with linear backoff. When every attempt
    /// fails the lookup fails, so a flaky backend never turns an existing
    /// user into a fresh signup.
    async fn find_identity(&self, public_key: &str) -> Result<Option<User>, AuthError> {
        let mut attempt = 1;
        loop {
            match self
                .users
                .find_by_auth_method(self.method(), public_key)
                .await
            {
                Ok(user) => return Ok(user),
                Err(e) if attempt < LOOKUP_ATTEMPTS => {
                    tracing::warn!(
                        public_key = %public_key,
                        attempt,
                        error = %e,
                        "Identity lookup failed, retrying"
                    );
                    tokio::time::sleep(LOOKUP_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(public_key = %public_key, error = %e, "Identity lookup failed");
                    return Err(AuthError::ServiceUnavailable(
                        "User lookup unavailable".to_string(),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl AuthEngine for SolanaAuthEngine {
    fn method(&self) -> AuthMethod {
        AuthMethod::Solana
    }

    async fn generate_challenge(&self, public_key: &str) -> Result<String, AuthError> {
        self.challenges.generate(public_key).await
    }

    async fn login(&self, data: LoginData) -> Result<LoginOutcome, AuthError> {
        data.validate()?;
        self.verifier.verify(&data.signed_challenge()).await?;

        let (user, is_new) = match self.find_identity(&data.public_key).await? {
            Some(user) => (UserView::from(user), false),
            None => (self.signup(SignupData::from(&data)).await?, true),
        };

        let tokens = self.tokens.issue(&user).await?;

        tracing::info!(user_id = %user.id, is_new, "Wallet login");

        Ok(LoginOutcome {
            tokens,
            user,
            is_new,
        })
    }

    async fn signup(&self, data: SignupData) -> Result<UserView, AuthError> {
        let user = self
            .registration
            .register(RegistrationRequest {
                method: self.method(),
                token: data.public_key,
                referral_code: data.referral_code,
                onboarding_exp_bonus: data.onboarding_exp_bonus,
            })
            .await?;

        Ok(user)
    }

    async fn attach(&self, user_id: Uuid, data: AttachData) -> Result<LoginOutcome, AuthError> {
        data.validate()?;

        if let Some(owner) = self.find_identity(&data.public_key).await? {
            if owner.id != user_id {
                return Err(AuthError::MethodAlreadyTaken);
            }
        }

        self.verifier.verify(&data.signed_challenge()).await?;

        let entry = AuthMethodEntry::new(self.method(), &data.public_key);
        let user = match self.users.attach_method(user_id, &entry).await? {
            AttachOutcome::Attached(user) => UserView::from(user),
            AttachOutcome::Taken => return Err(AuthError::MethodAlreadyTaken),
            AttachOutcome::UserMissing => return Err(AuthError::UserNotFound),
        };

        tracing::info!(
            user_id = %user_id,
            origin = ?data.origin,
            "Wallet attached"
        );

        let tokens = self.tokens.issue(&user).await?;

        Ok(LoginOutcome {
            tokens,
            user,
            is_new: false,
        })
    }

    async fn unattach(&self, user_id: Uuid) -> Result<(), AuthError> {
        if !unattach_method(self.users.as_ref(), user_id, self.method()).await? {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
