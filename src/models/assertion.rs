// src/models/assertion.rs
//! Wire data structures for signed status assertions.
//!
//! A status assertion is a compact three-part signed token
//! (`header.payload.signature`, each part base64url) whose payload binds a
//! published status list snapshot, a bit index, the issuer identity, and a
//! validity window. The claim schema is fixed: every field is required and
//! deserialization fails on a missing one, rather than tolerating an
//! open-ended claim map.

use serde::{Deserialize, Serialize};

/// The only signing algorithm this service issues or accepts.
pub const ALG_ES256: &str = "ES256";

/// Protected header of the assertion token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signing algorithm tag; must be [`ALG_ES256`].
    pub alg: String,

    /// Token type hint, conventionally `"JWT"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl JwsHeader {
    /// Header for a freshly issued ES256 assertion.
    pub fn es256() -> Self {
        JwsHeader {
            alg: ALG_ES256.to_string(),
            typ: Some("JWT".to_string()),
        }
    }
}

/// The embedded status reference inside an assertion payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusClaim {
    /// Transport form of the status list (gzip + standard base64).
    #[serde(rename = "encodedList")]
    pub encoded_list: String,

    /// Bit index this assertion was issued for.
    pub index: usize,
}

/// Claim set of a status assertion.
///
/// Immutable once signed; a changed claim requires a new assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issued-at, seconds since the UNIX epoch.
    pub iat: i64,

    /// Expires-at, seconds since the UNIX epoch.
    pub exp: i64,

    /// Issuer identity: `{base authority}/api/status/{status list id}`.
    pub iss: String,

    /// The published status list snapshot and queried index.
    pub status: StatusClaim,
}

impl AssertionClaims {
    /// Computes the expected `iss` value for a status list.
    ///
    /// The base authority is a configuration value and must be identical
    /// on the signing and verifying side.
    pub fn expected_issuer(base_authority: &str, status_list_id: &str) -> String {
        format!("{}/api/status/{}", base_authority, status_list_id)
    }
}
