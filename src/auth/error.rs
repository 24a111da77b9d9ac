//! Auth error taxonomy

use thiserror::Error;

use crate::db::StoreError;

use super::jwt::JwtError;

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Nonce is expired")]
    NonceExpired,

    #[error("Signature is invalid")]
    InvalidSignature,

    #[error("Method already taken")]
    MethodAlreadyTaken,

    #[error("Failed to generate message")]
    MessageGenerationFailed,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::MethodAlreadyTaken,
            e => AuthError::Store(e.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::Token(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(e: validator::ValidationErrors) -> Self {
        AuthError::Validation(e.to_string())
    }
}
