// src/errors.rs
//! Error taxonomy for the status assertion service.
//!
//! Every failure a codec, signing, verification, or storage operation can
//! produce is a distinct variant. Verification errors are never collapsed
//! into a generic "invalid" result: callers decide how much detail to expose
//! externally, but internal logic keeps the reason (issuer policy and clock
//! handling may differ per variant). All variants are terminal for the
//! current operation; retry policy belongs to the caller.

use thiserror::Error;

/// Errors produced by status list, assertion, and storage operations.
#[derive(Debug, Error)]
pub enum StatusError {
    /// A bit index does not address a bit within the status list.
    #[error("index out of range")]
    IndexOutOfRange,

    /// The compression or text-encoding stage of the codec failed.
    #[error("failed to encode status list: {0}")]
    Encode(String),

    /// The transport form could not be decoded back into raw bytes.
    #[error("failed to decode status list: {0}")]
    Decode(String),

    /// The wire token is structurally invalid or declares an unsupported
    /// signing algorithm.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The ECDSA signature does not verify under the supplied public key.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token's `iat` claim lies in the future.
    #[error("token used before issued")]
    TokenNotYetValid,

    /// The token's `exp` claim has passed.
    #[error("token expired")]
    TokenExpired,

    /// The `iss` claim does not match the expected issuer for the list.
    #[error("unexpected issuer: {0}")]
    IssuerMismatch(String),

    /// No status list exists under the requested identifier.
    #[error("status list not found")]
    NotFound,

    /// The status store rejected or failed the operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// The status store cannot be reached; the read-modify-write cycle was
    /// aborted without committing a partial write.
    #[error("storage unavailable")]
    StorageUnavailable,
}
