//! Data models for the wallet auth server

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::{fmt, str::FromStr};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// Supported authentication methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Solana,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Solana => "solana",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solana" => Ok(AuthMethod::Solana),
            other => Err(format!("Unknown auth method: {}", other)),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authentication method attached to a user; `token` is the wallet public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMethodEntry {
    pub method: AuthMethod,
    pub token: String,
}

impl AuthMethodEntry {
    pub fn new(method: AuthMethod, token: impl Into<String>) -> Self {
        Self {
            method,
            token: token.into(),
        }
    }
}

/// User model
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub auth_methods: Vec<AuthMethodEntry>,
    pub referred_by: Option<String>,
    pub experience: i64,
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_auth_method(&self, method: AuthMethod, token: &str) -> bool {
        self.auth_methods
            .iter()
            .any(|entry| entry.method == method && entry.token == token)
    }
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub auth_methods: Vec<AuthMethodEntry>,
    pub referred_by: Option<String>,
    pub experience: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            auth_methods: user.auth_methods,
            referred_by: user.referred_by,
            experience: user.experience,
            created_at: user.created_at,
        }
    }
}
