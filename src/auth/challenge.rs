//! Sign-in challenge messages

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::crypto::decode_solana_address;
use super::error::AuthError;
use super::nonce::NonceLedger;

const NONCE_LABEL: &str = "Nonce:";

/// Mints nonces and renders the message a wallet is asked to sign
#[derive(Clone)]
pub struct ChallengeGenerator {
    ledger: Arc<NonceLedger>,
    app_name: String,
}

impl ChallengeGenerator {
    pub fn new(ledger: Arc<NonceLedger>, app_name: impl Into<String>) -> Self {
        Self {
            ledger,
            app_name: app_name.into(),
        }
    }

    /// Issue a fresh nonce for `public_key` and return the message to sign
    ///
    /// Any previously issued, unconsumed challenge for the key stops being valid.
    pub async fn generate(&self, public_key: &str) -> Result<String, AuthError> {
        decode_solana_address(public_key)
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let nonce = generate_nonce(public_key)?;
        self.ledger.issue(public_key, &nonce).await?;

        tracing::debug!(public_key = %public_key, "Issued sign-in challenge");

        Ok(render_message(&self.app_name, public_key, &nonce))
    }
}

/// Extract the nonce embedded in a challenge message
pub fn extract_nonce(message: &str) -> Option<&str> {
    let mut lines = message.lines();
    lines.find(|line| line.trim() == NONCE_LABEL)?;
    lines.next().map(str::trim).filter(|nonce| !nonce.is_empty())
}

fn render_message(app_name: &str, public_key: &str, nonce: &str) -> String {
    format!(
        "Welcome to {app_name}!\n\n\
         Sign this message to prove you own this wallet and log in.\n\n\
         This request will not trigger a blockchain transaction or cost any gas fees. \
         It happens entirely off-chain.\n\n\
         Wallet address:\n{public_key}\n\n\
         {NONCE_LABEL}\n{nonce}"
    )
}

/// Hash of fresh OS randomness, bound to the key and the issue time
fn generate_nonce(public_key: &str) -> Result<String, AuthError> {
    let mut entropy = [0u8; 32];
    OsRng.try_fill_bytes(&mut entropy).map_err(|e| {
        tracing::error!(error = %e, "OS random source unavailable");
        AuthError::MessageGenerationFailed
    })?;

    let mut hasher = Sha256::new();
    hasher.update(entropy);
    hasher.update(public_key.as_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::nonce::MemoryNonceStore;
    use std::time::Duration;

    const ADDRESS: &str = "So11111111111111111111111111111111111111112";

    fn generator() -> (ChallengeGenerator, Arc<NonceLedger>) {
        let ledger = Arc::new(NonceLedger::new(
            Arc::new(MemoryNonceStore::new()),
            Duration::from_secs(60),
        ));
        (ChallengeGenerator::new(ledger.clone(), "Questboard"), ledger)
    }

    #[tokio::test]
    async fn test_message_contains_address_and_nonce() {
        let (generator, ledger) = generator();
        let message = generator.generate(ADDRESS).await.unwrap();

        assert!(message.starts_with("Welcome to Questboard!"));
        assert!(message.contains("off-chain"));
        assert!(message.contains(ADDRESS));

        let nonce = extract_nonce(&message).unwrap().to_string();
        assert_eq!(nonce.len(), 64);
        assert_eq!(ledger.consume(ADDRESS).await.unwrap(), nonce);
    }

    #[tokio::test]
    async fn test_each_challenge_has_new_nonce() {
        let (generator, _) = generator();
        let first = generator.generate(ADDRESS).await.unwrap();
        let second = generator.generate(ADDRESS).await.unwrap();

        assert_ne!(extract_nonce(&first), extract_nonce(&second));
    }

    #[tokio::test]
    async fn test_rejects_malformed_address() {
        let (generator, _) = generator();
        assert!(matches!(
            generator.generate("not a wallet").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_extract_nonce() {
        assert_eq!(extract_nonce("a\nNonce:\nabc123\n"), Some("abc123"));
        assert_eq!(extract_nonce("no nonce here"), None);
        assert_eq!(extract_nonce("Nonce:\n"), None);
    }
}
