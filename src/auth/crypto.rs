//! Solana signature verification
//!
//! Verifies ed25519 detached signatures produced by Solana wallets.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Length of a raw ed25519 public key
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of a raw ed25519 signature
pub const SIGNATURE_LENGTH: usize = 64;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid Solana address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Verify a Solana wallet signature
///
/// # Arguments
/// * `public_key` - base58 wallet address
/// * `message` - The exact message that was signed
/// * `signature_base58` - base58-encoded detached signature
pub fn verify_solana_signature(
    public_key: &str,
    message: &str,
    signature_base58: &str,
) -> Result<(), CryptoError> {
    let public_key_bytes = decode_solana_address(public_key)?;
    let signature_bytes = decode_signature(signature_base58)?;

    let signature = Signature::from_bytes(&signature_bytes);

    let verifying_key = VerifyingKey::from_bytes(&public_key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Decode a Solana address into its raw 32-byte ed25519 form
///
/// Solana addresses are the plain base58 (bitcoin alphabet) encoding of the
/// public key, with no version byte or checksum.
pub fn decode_solana_address(address: &str) -> Result<[u8; PUBLIC_KEY_LENGTH], CryptoError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;

    decoded.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidAddress(format!(
            "Expected {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })
}

fn decode_signature(encoded: &str) -> Result<[u8; SIGNATURE_LENGTH], CryptoError> {
    let decoded = bs58::decode(encoded.trim())
        .into_vec()
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    decoded.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidSignatureFormat(format!(
            "Expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, String) {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        (signing_key, address)
    }

    #[test]
    fn test_decode_solana_address() {
        let (signing_key, address) = keypair();
        let decoded = decode_solana_address(&address).unwrap();
        assert_eq!(&decoded, signing_key.verifying_key().as_bytes());
    }

    #[test]
    fn test_decode_address_wrong_length() {
        let short = bs58::encode([1u8; 20]).into_string();
        assert!(matches!(
            decode_solana_address(&short),
            Err(CryptoError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_decode_address_invalid_alphabet() {
        // '0', 'O', 'I' and 'l' are not in the base58 alphabet
        assert!(decode_solana_address("0OIl").is_err());
    }

    #[test]
    fn test_verify_valid_signature() {
        let (signing_key, address) = keypair();
        let message = "hello solana";
        let signature = bs58::encode(signing_key.sign(message.as_bytes()).to_bytes()).into_string();

        assert!(verify_solana_signature(&address, message, &signature).is_ok());
    }

    #[test]
    fn test_verify_tampered_message() {
        let (signing_key, address) = keypair();
        let signature = bs58::encode(signing_key.sign(b"original").to_bytes()).into_string();

        assert!(matches!(
            verify_solana_signature(&address, "tampered", &signature),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_verify_wrong_key() {
        let (signing_key, _) = keypair();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let other_address = bs58::encode(other.verifying_key().as_bytes()).into_string();
        let signature = bs58::encode(signing_key.sign(b"msg").to_bytes()).into_string();

        assert!(verify_solana_signature(&other_address, "msg", &signature).is_err());
    }

    #[test]
    fn test_verify_malformed_signature() {
        let (_, address) = keypair();
        assert!(matches!(
            verify_solana_signature(&address, "msg", "not-base58!"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
        let short = bs58::encode([0u8; 10]).into_string();
        assert!(matches!(
            verify_solana_signature(&address, "msg", &short),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
    }
}
