// src/lib.rs
//! Status list and signed status assertion service.
//!
//! Core pieces:
//! - [`models::status_list::StatusList`]: bit-indexed status storage
//! - [`utils::codec`]: gzip + base64 transport encoding
//! - [`services::assertion_signer::AssertionSigner`]: ES256-signed,
//!   time-bound, issuer-bound assertions over a status list snapshot
//! - [`services::verifier::AssertionVerifier`]: the relying-party
//!   verification state machine
//! - [`services::api_server::ApiServer`]: the REST surface
//! - [`storage::status_store::StatusStore`]: pluggable persistence

pub mod crypto; // ECDSA P-256 key operations
pub mod errors; // Error taxonomy
pub mod models; // Data structures
pub mod services; // Business logic and API
pub mod storage; // Status store backends
pub mod utils; // Transport codec
