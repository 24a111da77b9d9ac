//! Authentication request/response models

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::UserView;

// ============================================================================
// Request DTOs
// ============================================================================

/// Request for a sign-in challenge
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[validate(length(min = 32, max = 44))]
    pub public_key: String,
}

/// Wallet login, creating the account on first use
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[validate(length(min = 32, max = 44))]
    pub public_key: String,
    #[validate(length(min = 1, max = 128))]
    pub signature: String,
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
    #[validate(length(min = 1, max = 64))]
    pub referral_code: Option<String>,
    #[validate(range(min = 0, max = 100000))]
    pub onboarding_exp_bonus: Option<i64>,
}

impl LoginData {
    pub fn signed_challenge(&self) -> SignedChallenge {
        SignedChallenge {
            public_key: self.public_key.clone(),
            signature: self.signature.clone(),
            message: self.message.clone(),
        }
    }
}

/// Account creation keyed by a verified public key
#[derive(Debug, Clone)]
pub struct SignupData {
    pub public_key: String,
    pub referral_code: Option<String>,
    pub onboarding_exp_bonus: Option<i64>,
}

impl From<&LoginData> for SignupData {
    fn from(data: &LoginData) -> Self {
        Self {
            public_key: data.public_key.clone(),
            referral_code: data.referral_code.clone(),
            onboarding_exp_bonus: data.onboarding_exp_bonus,
        }
    }
}

/// Attach a wallet to the authenticated account
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttachData {
    #[validate(length(max = 256))]
    pub origin: Option<String>,
    #[validate(length(min = 32, max = 44))]
    pub public_key: String,
    #[validate(length(min = 1, max = 128))]
    pub signature: String,
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
}

impl AttachData {
    pub fn signed_challenge(&self) -> SignedChallenge {
        SignedChallenge {
            public_key: self.public_key.clone(),
            signature: self.signature.clone(),
            message: self.message.clone(),
        }
    }
}

/// Refresh token request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// A challenge message signed by a wallet, consumed once by the verifier
#[derive(Debug, Clone)]
pub struct SignedChallenge {
    pub public_key: String,
    /// base58-encoded detached signature
    pub signature: String,
    pub message: String,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Challenge message to be signed by the wallet
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub message: String,
}

/// Access/refresh token pair
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful login, attach or refresh
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: UserView,
    pub is_new: bool,
}
