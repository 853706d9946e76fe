// src/services/verifier.rs
//! Status assertion verification.
//!
//! The [`AssertionVerifier`] walks a received wire token through a fixed
//! sequence of checks — structure, signature, freshness, issuer, status
//! extraction — and returns the single status bit only when every check
//! passes. Each failure surfaces its specific [`StatusError`] variant and
//! short-circuits; there is no fallback status value.
//!
//! The signature is verified before any claim value is trusted. Skipping
//! that ordering would let an attacker-controlled unsigned payload pass
//! the issuer and time checks.

use chrono::Utc;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};

use crate::errors::StatusError;
use crate::models::assertion::{AssertionClaims, JwsHeader, ALG_ES256};
use crate::utils::codec;

/// Verifies signed status assertions against a configured issuer identity.
///
/// Holds no mutable state; fully reentrant across concurrent requests.
#[derive(Clone)]
pub struct AssertionVerifier {
    /// Base authority the `iss` claim must be rooted at. Must be the same
    /// configuration value the signer was given.
    base_authority: String,
}

impl AssertionVerifier {
    /// Creates a verifier expecting assertions issued under `base_authority`.
    pub fn new(base_authority: String) -> Self {
        AssertionVerifier { base_authority }
    }

    /// Verifies a wire token and extracts the status bit at `index`.
    ///
    /// # Arguments
    /// * `token` - Compact three-part wire form of the assertion
    /// * `public_key` - Issuer's P-256 public key
    /// * `status_list_id` - Status list the token must have been issued for
    /// * `index` - Bit index being queried
    ///
    /// # Errors
    /// - [`StatusError::MalformedToken`] - wrong part count, bad base64url,
    ///   unparseable header or claims, or a non-ES256 algorithm tag
    /// - [`StatusError::InvalidSignature`] - signature does not verify
    /// - [`StatusError::TokenNotYetValid`] / [`StatusError::TokenExpired`]
    /// - [`StatusError::IssuerMismatch`]
    /// - [`StatusError::Decode`] - embedded list fails transport decoding
    /// - [`StatusError::IndexOutOfRange`] - `index` beyond the decoded list
    pub fn verify(
        &self,
        token: &str,
        public_key: &VerifyingKey,
        status_list_id: &str,
        index: usize,
    ) -> Result<bool, StatusError> {
        let claims = self.verify_claims(token, public_key)?;

        let now = Utc::now().timestamp();
        if claims.iat > now {
            return Err(StatusError::TokenNotYetValid);
        }
        if claims.exp < now {
            return Err(StatusError::TokenExpired);
        }

        let expected = AssertionClaims::expected_issuer(&self.base_authority, status_list_id);
        if claims.iss != expected {
            return Err(StatusError::IssuerMismatch(claims.iss));
        }

        extract_status(&claims.status.encoded_list, index)
    }

    /// Checks token structure and signature, returning the claim set.
    ///
    /// Performs the structural and cryptographic steps of the verification
    /// sequence plus the claim parse; freshness and issuer policy stay
    /// with [`Self::verify`].
    fn verify_claims(
        &self,
        token: &str,
        public_key: &VerifyingKey,
    ) -> Result<AssertionClaims, StatusError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(StatusError::MalformedToken(
                "expected three non-empty segments".to_string(),
            ));
        }

        let header_bytes = decode_segment(parts[0])?;
        let header: JwsHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| StatusError::MalformedToken(format!("invalid header: {}", e)))?;

        // Closed algorithm set: exactly one member. Anything else, `none`
        // included, is rejected before the signature is even looked at.
        if header.alg != ALG_ES256 {
            return Err(StatusError::MalformedToken(format!(
                "unexpected signing method: {}",
                header.alg
            )));
        }

        let signature_bytes = decode_segment(parts[2])?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|_| StatusError::InvalidSignature)?;

        let signing_input = format!("{}.{}", parts[0], parts[1]);
        public_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| StatusError::InvalidSignature)?;

        // Only now is the payload trusted enough to parse.
        let payload_bytes = decode_segment(parts[1])?;
        serde_json::from_slice(&payload_bytes)
            .map_err(|e| StatusError::MalformedToken(format!("invalid claims: {}", e)))
    }
}

/// Decodes the embedded list and extracts the bit at `index`.
fn extract_status(encoded_list: &str, index: usize) -> Result<bool, StatusError> {
    let decoded = codec::decode(encoded_list)?;

    let byte_index = index / 8;
    let bit_index = index % 8;
    if byte_index >= decoded.len() {
        return Err(StatusError::IndexOutOfRange);
    }

    Ok(decoded[byte_index] & (1 << bit_index) != 0)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, StatusError> {
    base64::decode_config(segment, base64::URL_SAFE_NO_PAD)
        .map_err(|e| StatusError::MalformedToken(format!("invalid base64url segment: {}", e)))
}

/// Fetches a published assertion over HTTP and verifies it.
///
/// Client-side convenience: GETs `url` (typically
/// `{base authority}/api/status/{id}?index=N`), then runs the full
/// verification sequence over the response body.
pub async fn fetch_status(
    url: &str,
    public_key: &VerifyingKey,
    base_authority: &str,
    status_list_id: &str,
    index: usize,
) -> anyhow::Result<bool> {
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        anyhow::bail!("received non-OK HTTP status: {}", response.status());
    }
    let body = response.text().await?;

    let verifier = AssertionVerifier::new(base_authority.to_string());
    Ok(verifier.verify(body.trim(), public_key, status_list_id, index)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key_management::KeyManager;
    use crate::models::assertion::StatusClaim;
    use crate::models::status_list::StatusList;
    use crate::services::assertion_signer::AssertionSigner;
    use chrono::Duration;
    use std::sync::Arc;

    const AUTHORITY: &str = "http://localhost:8000";

    fn signer_with_keys() -> (AssertionSigner, Arc<KeyManager>) {
        let keys = Arc::new(KeyManager::new());
        let signer = AssertionSigner::new(
            keys.clone(),
            AUTHORITY.to_string(),
            Duration::hours(24),
        );
        (signer, keys)
    }

    fn verifier() -> AssertionVerifier {
        AssertionVerifier::new(AUTHORITY.to_string())
    }

    fn sample_list() -> StatusList {
        let mut list = StatusList::new();
        list.add_status(true); // index 0
        list.add_status(false); // index 8
        list
    }

    #[test]
    fn test_verify_returns_signed_status_bit() {
        let (signer, keys) = signer_with_keys();
        let list = sample_list();

        let token = signer.sign_assertion("list1", &list, 0).unwrap();
        let status = verifier()
            .verify(&token, keys.verifying_key(), "list1", 0)
            .unwrap();
        assert_eq!(status, true);

        let token = signer.sign_assertion("list1", &list, 8).unwrap();
        let status = verifier()
            .verify(&token, keys.verifying_key(), "list1", 8)
            .unwrap();
        assert_eq!(status, false);
    }

    #[test]
    fn test_wrong_public_key_fails_signature() {
        let (signer, _keys) = signer_with_keys();
        let other = KeyManager::new();

        let token = signer.sign_assertion("list1", &sample_list(), 0).unwrap();
        assert!(matches!(
            verifier().verify(&token, other.verifying_key(), "list1", 0),
            Err(StatusError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let (signer, keys) = signer_with_keys();
        let token = signer.sign_assertion("list1", &sample_list(), 0).unwrap();

        // Re-encode the payload with one claim altered; header and
        // signature stay intact.
        let parts: Vec<&str> = token.split('.').collect();
        let mut claims: AssertionClaims =
            serde_json::from_slice(&decode_segment(parts[1]).unwrap()).unwrap();
        claims.status.index = 8;
        let forged_payload = base64::encode_config(
            serde_json::to_vec(&claims).unwrap(),
            base64::URL_SAFE_NO_PAD,
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(matches!(
            verifier().verify(&forged, keys.verifying_key(), "list1", 0),
            Err(StatusError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_structure_is_rejected() {
        let (_, keys) = signer_with_keys();
        let v = verifier();

        for token in ["", "onlyone", "two.parts", "a.b.c.d", "..", "a..c"] {
            assert!(
                matches!(
                    v.verify(token, keys.verifying_key(), "list1", 0),
                    Err(StatusError::MalformedToken(_))
                ),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_downgraded_algorithm_is_rejected() {
        let (signer, keys) = signer_with_keys();
        let token = signer.sign_assertion("list1", &sample_list(), 0).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        for alg in ["none", "HS256", "RS256", "ES384"] {
            let header = base64::encode_config(
                serde_json::to_vec(&JwsHeader {
                    alg: alg.to_string(),
                    typ: Some("JWT".to_string()),
                })
                .unwrap(),
                base64::URL_SAFE_NO_PAD,
            );
            let downgraded = format!("{}.{}.{}", header, parts[1], parts[2]);
            assert!(
                matches!(
                    verifier().verify(&downgraded, keys.verifying_key(), "list1", 0),
                    Err(StatusError::MalformedToken(_))
                ),
                "alg {:?} should be rejected",
                alg
            );
        }
    }

    fn signed_claims_token(signer: &AssertionSigner, iat: i64, exp: i64, iss: &str) -> String {
        let claims = AssertionClaims {
            iat,
            exp,
            iss: iss.to_string(),
            status: StatusClaim {
                encoded_list: codec::encode(sample_list().as_bytes()).unwrap(),
                index: 0,
            },
        };
        signer.sign_claims(&claims).unwrap()
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let (signer, keys) = signer_with_keys();
        let now = Utc::now().timestamp();
        let iss = AssertionClaims::expected_issuer(AUTHORITY, "list1");

        let token = signed_claims_token(&signer, now - 7200, now - 3600, &iss);
        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 0),
            Err(StatusError::TokenExpired)
        ));
    }

    #[test]
    fn test_future_token_is_rejected() {
        let (signer, keys) = signer_with_keys();
        let now = Utc::now().timestamp();
        let iss = AssertionClaims::expected_issuer(AUTHORITY, "list1");

        let token = signed_claims_token(&signer, now + 3600, now + 7200, &iss);
        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 0),
            Err(StatusError::TokenNotYetValid)
        ));
    }

    #[test]
    fn test_issuer_mismatch_is_rejected_despite_valid_signature() {
        let (signer, keys) = signer_with_keys();
        let now = Utc::now().timestamp();

        // Signed for a different list id.
        let iss = AssertionClaims::expected_issuer(AUTHORITY, "other-list");
        let token = signed_claims_token(&signer, now, now + 3600, &iss);
        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 0),
            Err(StatusError::IssuerMismatch(_))
        ));

        // Signed under a different authority.
        let iss = AssertionClaims::expected_issuer("http://evil.example", "list1");
        let token = signed_claims_token(&signer, now, now + 3600, &iss);
        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 0),
            Err(StatusError::IssuerMismatch(_))
        ));
    }

    #[test]
    fn test_index_beyond_decoded_list_is_rejected() {
        let (signer, keys) = signer_with_keys();
        let token = signer.sign_assertion("list1", &sample_list(), 0).unwrap();

        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 16),
            Err(StatusError::IndexOutOfRange)
        ));
    }

    #[test]
    fn test_garbled_embedded_list_is_a_decode_error() {
        let (signer, keys) = signer_with_keys();
        let now = Utc::now().timestamp();

        let claims = AssertionClaims {
            iat: now,
            exp: now + 3600,
            iss: AssertionClaims::expected_issuer(AUTHORITY, "list1"),
            status: StatusClaim {
                encoded_list: base64::encode(b"not a gzip stream"),
                index: 0,
            },
        };
        let token = signer.sign_claims(&claims).unwrap();

        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 0),
            Err(StatusError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_claim_field_is_malformed() {
        let keys = KeyManager::new();

        // Valid JSON payload missing the `status` claim, signed correctly
        // so the failure is attributable to the schema, not the signature.
        let header = base64::encode_config(
            serde_json::to_vec(&JwsHeader::es256()).unwrap(),
            base64::URL_SAFE_NO_PAD,
        );
        let payload = base64::encode_config(
            br#"{"iat":1,"exp":9999999999,"iss":"x"}"#.to_vec(),
            base64::URL_SAFE_NO_PAD,
        );
        let signing_input = format!("{}.{}", header, payload);
        let sig = base64::encode_config(
            keys.sign(signing_input.as_bytes()).to_bytes(),
            base64::URL_SAFE_NO_PAD,
        );
        let token = format!("{}.{}", signing_input, sig);

        assert!(matches!(
            verifier().verify(&token, keys.verifying_key(), "list1", 0),
            Err(StatusError::MalformedToken(_))
        ));
    }
}
