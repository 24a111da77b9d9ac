//! Challenge/response verification

use std::sync::Arc;

use crate::models::SignedChallenge;

use super::challenge::extract_nonce;
use super::crypto::verify_solana_signature;
use super::error::AuthError;
use super::nonce::NonceLedger;

/// Checks that a signed challenge answers the live nonce for its key
#[derive(Clone)]
pub struct SignatureVerifier {
    ledger: Arc<NonceLedger>,
}

impl SignatureVerifier {
    pub fn new(ledger: Arc<NonceLedger>) -> Self {
        Self { ledger }
    }

    /// Consume the nonce for `challenge.public_key` and verify the signature
    ///
    /// The nonce is consumed before any signature work, so it cannot be
    /// retried after a failed attempt.
    pub async fn verify(&self, challenge: &SignedChallenge) -> Result<(), AuthError> {
        let nonce = self.ledger.consume(&challenge.public_key).await?;

        if extract_nonce(&challenge.message) != Some(nonce.as_str()) {
            tracing::debug!(
                public_key = %challenge.public_key,
                "Signed message does not carry the live nonce"
            );
            return Err(AuthError::NonceExpired);
        }

        verify_solana_signature(
            &challenge.public_key,
            &challenge.message,
            &challenge.signature,
        )
        .map_err(|e| {
            tracing::debug!(public_key = %challenge.public_key, error = %e, "Signature rejected");
            AuthError::InvalidSignature
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::challenge::ChallengeGenerator;
    use crate::auth::nonce::{MemoryNonceStore, NonceRecord, NonceStore};
    use chrono::Utc;
    use ed25519_dalek::{Signer, SigningKey};
    use std::time::Duration;

    struct Fixture {
        generator: ChallengeGenerator,
        verifier: SignatureVerifier,
        store: MemoryNonceStore,
        key: SigningKey,
        address: String,
    }

    fn fixture() -> Fixture {
        let store = MemoryNonceStore::new();
        let ledger = Arc::new(NonceLedger::new(
            Arc::new(store.clone()),
            Duration::from_millis(60_000),
        ));
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let address = bs58::encode(key.verifying_key().as_bytes()).into_string();

        Fixture {
            generator: ChallengeGenerator::new(ledger.clone(), "Test"),
            verifier: SignatureVerifier::new(ledger),
            store,
            key,
            address,
        }
    }

    fn sign(key: &SigningKey, address: &str, message: &str) -> SignedChallenge {
        SignedChallenge {
            public_key: address.to_string(),
            signature: bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_signature_is_accepted() {
        let f = fixture();
        let message = f.generator.generate(&f.address).await.unwrap();

        let challenge = sign(&f.key, &f.address, &message);
        assert!(f.verifier.verify(&challenge).await.is_ok());
    }

    #[tokio::test]
    async fn test_replay_is_rejected() {
        let f = fixture();
        let message = f.generator.generate(&f.address).await.unwrap();
        let challenge = sign(&f.key, &f.address, &message);

        f.verifier.verify(&challenge).await.unwrap();
        assert!(matches!(
            f.verifier.verify(&challenge).await,
            Err(AuthError::NonceExpired)
        ));
    }

    #[tokio::test]
    async fn test_superseded_challenge_is_rejected() {
        let f = fixture();
        let first = f.generator.generate(&f.address).await.unwrap();
        let _second = f.generator.generate(&f.address).await.unwrap();

        let challenge = sign(&f.key, &f.address, &first);
        assert!(matches!(
            f.verifier.verify(&challenge).await,
            Err(AuthError::NonceExpired)
        ));
    }

    #[tokio::test]
    async fn test_expired_nonce_is_rejected() {
        let f = fixture();
        let message = f.generator.generate(&f.address).await.unwrap();
        let nonce = extract_nonce(&message).unwrap().to_string();

        let stale = Utc::now().timestamp_millis() - 60_001;
        f.store
            .put(&f.address, NonceRecord::new(nonce, stale))
            .await
            .unwrap();

        let challenge = sign(&f.key, &f.address, &message);
        assert!(matches!(
            f.verifier.verify(&challenge).await,
            Err(AuthError::NonceExpired)
        ));
    }

    #[tokio::test]
    async fn test_wrong_signer_consumes_nonce() {
        let f = fixture();
        let message = f.generator.generate(&f.address).await.unwrap();

        let impostor = SigningKey::from_bytes(&[4u8; 32]);
        let forged = sign(&impostor, &f.address, &message);
        assert!(matches!(
            f.verifier.verify(&forged).await,
            Err(AuthError::InvalidSignature)
        ));

        // The genuine signature can no longer use the burnt nonce
        let genuine = sign(&f.key, &f.address, &message);
        assert!(matches!(
            f.verifier.verify(&genuine).await,
            Err(AuthError::NonceExpired)
        ));
    }

    #[tokio::test]
    async fn test_undecodable_signature_is_invalid() {
        let f = fixture();
        let message = f.generator.generate(&f.address).await.unwrap();

        let challenge = SignedChallenge {
            public_key: f.address.clone(),
            signature: "0OIl".to_string(),
            message,
        };
        assert!(matches!(
            f.verifier.verify(&challenge).await,
            Err(AuthError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_no_challenge_issued() {
        let f = fixture();
        let challenge = sign(&f.key, &f.address, "Nonce:\nmade-up");
        assert!(matches!(
            f.verifier.verify(&challenge).await,
            Err(AuthError::NonceExpired)
        ));
    }
}
