// src/crypto/mod.rs
//! Cryptographic key operations (P-256 key pair management).

pub mod key_management;
