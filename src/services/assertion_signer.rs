// src/services/assertion_signer.rs
//! Status assertion construction and signing.
//!
//! An [`AssertionSigner`] turns a status list snapshot plus a bit index
//! into the compact signed wire form (`header.payload.signature`, each
//! part base64url). Assertions are built fresh per request, signed
//! immediately, and never mutated afterwards; the signer performs no
//! store I/O.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::crypto::key_management::KeyManager;
use crate::errors::StatusError;
use crate::models::assertion::{AssertionClaims, JwsHeader, StatusClaim};
use crate::models::status_list::StatusList;
use crate::utils::codec;

/// Signs time-bound, issuer-bound claims over an encoded status list.
#[derive(Clone)]
pub struct AssertionSigner {
    /// P-256 signing key, shared read-only across concurrent requests.
    key_manager: Arc<KeyManager>,

    /// Root identity string used to build the `iss` claim. Must match the
    /// value verifiers are configured with.
    base_authority: String,

    /// How long each issued assertion stays valid.
    validity: Duration,
}

impl AssertionSigner {
    /// Creates a signer for the given key and issuer base authority.
    pub fn new(key_manager: Arc<KeyManager>, base_authority: String, validity: Duration) -> Self {
        AssertionSigner {
            key_manager,
            base_authority,
            validity,
        }
    }

    /// Builds and signs a status assertion for one bit of a status list.
    ///
    /// The claim set is `iat = now`, `exp = now + validity`,
    /// `iss = {base authority}/api/status/{id}`, and the re-encoded list
    /// plus queried index under `status`.
    ///
    /// # Errors
    /// - [`StatusError::IndexOutOfRange`] if `index` does not address a
    ///   bit in `status_list`
    /// - [`StatusError::Encode`] if the transport encoding fails
    pub fn sign_assertion(
        &self,
        status_list_id: &str,
        status_list: &StatusList,
        index: usize,
    ) -> Result<String, StatusError> {
        if index >= status_list.bit_count() {
            return Err(StatusError::IndexOutOfRange);
        }

        let encoded_list = codec::encode(status_list.as_bytes())?;

        let now = Utc::now();
        let claims = AssertionClaims {
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
            iss: AssertionClaims::expected_issuer(&self.base_authority, status_list_id),
            status: StatusClaim {
                encoded_list,
                index,
            },
        };

        self.sign_claims(&claims)
    }

    /// Serializes and signs an already-built claim set.
    ///
    /// Split out so tests can issue assertions with arbitrary validity
    /// windows or issuers.
    pub fn sign_claims(&self, claims: &AssertionClaims) -> Result<String, StatusError> {
        let header_json = serde_json::to_vec(&JwsHeader::es256())
            .map_err(|e| StatusError::Encode(format!("failed to serialize header: {}", e)))?;
        let payload_json = serde_json::to_vec(claims)
            .map_err(|e| StatusError::Encode(format!("failed to serialize claims: {}", e)))?;

        let header = base64::encode_config(header_json, base64::URL_SAFE_NO_PAD);
        let payload = base64::encode_config(payload_json, base64::URL_SAFE_NO_PAD);

        let signing_input = format!("{}.{}", header, payload);
        let signature = self.key_manager.sign(signing_input.as_bytes());
        let signature = base64::encode_config(signature.to_bytes(), base64::URL_SAFE_NO_PAD);

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// The base authority this signer issues under.
    pub fn base_authority(&self) -> &str {
        &self.base_authority
    }
}
