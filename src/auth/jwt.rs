//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens, and the
//! refresh-token bookkeeping kept on the user record.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{LoginOutcome, TokenPair, UserView};
use crate::users::UserStore;

use super::error::AuthError;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Token type (access or refresh)
    pub token_type: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::InvalidToken(e.to_string()))
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        self.token_type == token_type.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Generate an access token for a user
pub fn generate_access_token(
    user_id: Uuid,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    generate_token(user_id, secret, ttl_seconds, TokenType::Access)
}

/// Generate a refresh token for a user
pub fn generate_refresh_token(
    user_id: Uuid,
    secret: &str,
    ttl_days: i64,
) -> Result<String, JwtError> {
    let ttl_seconds = ttl_days * 24 * 60 * 60;
    generate_token(user_id, secret, ttl_seconds, TokenType::Refresh)
}

fn generate_token(
    user_id: Uuid,
    secret: &str,
    ttl_seconds: i64,
    token_type: TokenType,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        token_type: token_type.as_str().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issues token pairs and tracks the live refresh token of each user
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn UserStore>,
    secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
}

impl TokenService {
    pub fn new(
        store: Arc<dyn UserStore>,
        secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            store,
            secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
        }
    }

    pub fn generate_tokens(&self, user: &UserView) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: generate_access_token(
                user.id,
                &self.secret,
                self.access_token_ttl_seconds,
            )?,
            refresh_token: generate_refresh_token(
                user.id,
                &self.secret,
                self.refresh_token_ttl_days,
            )?,
        })
    }

    /// Persist the refresh token hash, revoking any earlier refresh token
    pub async fn save_token(&self, user_id: Uuid, refresh_token: &str) -> Result<(), AuthError> {
        self.store
            .set_refresh_token_hash(user_id, &hash_token(refresh_token))
            .await?;
        Ok(())
    }

    /// Generate and save a fresh pair for `user`
    pub async fn issue(&self, user: &UserView) -> Result<TokenPair, AuthError> {
        let tokens = self.generate_tokens(user)?;
        self.save_token(user.id, &tokens.refresh_token).await?;
        Ok(tokens)
    }

    /// Decode an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = verify_token(token, &self.secret)?;
        if !claims.is(TokenType::Access) {
            return Err(JwtError::InvalidToken("Expected access token".to_string()));
        }
        Ok(claims)
    }

    /// Exchange a live refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginOutcome, AuthError> {
        let claims =
            verify_token(refresh_token, &self.secret).map_err(|_| AuthError::InvalidRefreshToken)?;

        if !claims.is(TokenType::Refresh) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user_id = claims
            .user_id()
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let current_hash = hash_token(refresh_token);
        if user.refresh_token_hash.as_deref() != Some(current_hash.as_str()) {
            tracing::warn!(user_id = %user_id, "Refresh token reuse or revoked token");
            return Err(AuthError::InvalidRefreshToken);
        }

        let user: UserView = user.into();
        let tokens = self.generate_tokens(&user)?;

        // Only one exchange of a given refresh token may win
        let new_hash = hash_token(&tokens.refresh_token);
        let rotated = self
            .store
            .replace_refresh_token_hash(user_id, &current_hash, &new_hash)
            .await?;
        if !rotated {
            tracing::warn!(user_id = %user_id, "Refresh token already rotated");
            return Err(AuthError::InvalidRefreshToken);
        }

        Ok(LoginOutcome {
            tokens,
            user,
            is_new: false,
        })
    }
}
