//! Wallet authentication
//!
//! - Challenge-response authentication with single-use nonces
//! - ed25519 verification of Solana wallet signatures
//! - Per-method auth engines (login, signup, attach, unattach, logout)
//! - JWT access/refresh tokens

mod challenge;
mod crypto;
mod engine;
mod error;
mod jwt;
mod nonce;
mod verifier;

pub use challenge::{extract_nonce, ChallengeGenerator};
pub use crypto::{decode_solana_address, verify_solana_signature, CryptoError};
pub use engine::{AuthEngine, AuthEngines, SolanaAuthEngine};
pub use error::AuthError;
pub use jwt::{verify_token, Claims, JwtError, TokenService, TokenType};
pub use nonce::{MemoryNonceStore, NonceLedger, NonceRecord, NonceStore, PgNonceStore};
pub use verifier::SignatureVerifier;
