// src/crypto/key_management.rs
//! Cryptographic key management for assertion signing.
//!
//! Provides generation, loading, and usage of the ECDSA key pair used to
//! sign status assertions:
//! - P-256 (secp256r1) curve via the `p256` crate
//! - SHA-256 digesting, per ES256
//! - PKCS#8 PEM import for the signing key, SPKI PEM for the public key
//!
//! Keys are read-only after load and may be shared freely across concurrent
//! signing operations.

use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};

use crate::errors::StatusError;

/// Holder of the service's P-256 signing key and its derived public key.
#[derive(Clone)]
pub struct KeyManager {
    /// Private signing key (never exposed).
    signing_key: SigningKey,
    /// Derived public key for verification.
    verifying_key: VerifyingKey,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh random P-256 key pair.
    pub fn new() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let verifying_key = VerifyingKey::from(&signing_key);
        KeyManager {
            signing_key,
            verifying_key,
        }
    }

    /// Loads a KeyManager from a PKCS#8 PEM-encoded private key.
    ///
    /// # Errors
    /// Returns [`StatusError::Storage`] if the PEM block cannot be parsed
    /// as a P-256 private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, StatusError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| StatusError::Storage(format!("failed to parse signing key PEM: {}", e)))?;
        let verifying_key = VerifyingKey::from(&signing_key);
        Ok(KeyManager {
            signing_key,
            verifying_key,
        })
    }

    /// Signs a message with ECDSA P-256/SHA-256.
    ///
    /// Signatures are nonce-based: two calls over the same message may
    /// yield different bitstrings, and both verify. Returned in fixed
    /// 64-byte r||s form.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// The public half of the key pair.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Exports the public key as an SPKI PEM string, for distribution to
    /// relying parties.
    ///
    /// # Errors
    /// Returns [`StatusError::Encode`] if DER/PEM serialization fails.
    pub fn public_key_pem(&self) -> Result<String, StatusError> {
        self.verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| StatusError::Encode(format!("failed to encode public key PEM: {}", e)))
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a relying party's copy of the issuer public key from SPKI PEM.
pub fn parse_public_key_pem(pem: &str) -> Result<VerifyingKey, StatusError> {
    VerifyingKey::from_public_key_pem(pem)
        .map_err(|e| StatusError::Decode(format!("failed to parse public key PEM: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Verifier;

    #[test]
    fn test_sign_verifies_under_own_key() {
        let keys = KeyManager::new();
        let signature = keys.sign(b"status assertion payload");
        assert!(keys
            .verifying_key()
            .verify(b"status assertion payload", &signature)
            .is_ok());
    }

    #[test]
    fn test_signature_fails_under_other_key() {
        let keys = KeyManager::new();
        let other = KeyManager::new();
        let signature = keys.sign(b"message");
        assert!(other.verifying_key().verify(b"message", &signature).is_err());
    }

    #[test]
    fn test_public_key_pem_roundtrip() {
        let keys = KeyManager::new();
        let pem = keys.public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));

        let parsed = parse_public_key_pem(&pem).unwrap();
        assert_eq!(&parsed, keys.verifying_key());
    }

    #[test]
    fn test_parse_public_key_pem_rejects_garbage() {
        assert!(matches!(
            parse_public_key_pem("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----\n"),
            Err(StatusError::Decode(_))
        ));
    }
}
