// src/services/mod.rs
//! Business logic and API: assertion signing, assertion verification, and
//! the HTTP surface.

pub mod api_server;
pub mod assertion_signer;
pub mod verifier;
