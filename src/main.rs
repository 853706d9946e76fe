// src/main.rs

//! # Status Assertion Server - Main Entry Point
//!
//! Issues and publishes signed status assertions over bit-indexed status
//! lists, and lets authenticated callers mutate individual status bits.
//!
//! ## Architecture Overview
//! 1. **Models**: `StatusList` bit storage and the assertion claim schema
//! 2. **Codec**: gzip + base64 transport encoding of status lists
//! 3. **Services**: assertion signing, assertion verification, REST API
//! 4. **Storage**: pluggable `StatusStore` (in-memory by default)
//! 5. **Cryptography**: ECDSA P-256 key management
//!
//! ## Environment Variables
//! - `BASE_AUTHORITY`: issuer root identity, e.g. `http://localhost:8000`.
//!   Must be configured identically on the verifying side.
//! - `BIND_ADDR`: socket address to listen on (default `127.0.0.1:8000`)
//! - `AUTH_USERNAME` / `AUTH_PASSWORD`: basic-auth credentials for
//!   mutating endpoints
//! - `SIGNING_KEY_PEM`: (optional) path to a PKCS#8 PEM P-256 private key;
//!   a fresh key pair is generated when unset

use anyhow::Context;
use dotenv::dotenv;
use log::info;
use status_assertion_server::crypto::key_management::KeyManager;
use status_assertion_server::services::api_server::ApiServer;
use status_assertion_server::services::assertion_signer::AssertionSigner;
use status_assertion_server::storage::status_store::MemoryStatusStore;
use std::net::SocketAddr;
use std::sync::Arc;

/// How long each issued assertion stays valid.
const ASSERTION_VALIDITY_HOURS: i64 = 24;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Load or generate the signing key pair
/// 3. Initialize store, signer, and API server
/// 4. Start serving
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let base_authority =
        std::env::var("BASE_AUTHORITY").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let auth_username = std::env::var("AUTH_USERNAME").context("AUTH_USERNAME must be set")?;
    let auth_password = std::env::var("AUTH_PASSWORD").context("AUTH_PASSWORD must be set")?;

    // Load the signing key from PEM when configured, otherwise generate a
    // fresh pair for this run.
    let key_manager = match std::env::var("SIGNING_KEY_PEM") {
        Ok(path) => {
            let pem = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read signing key from {}", path))?;
            KeyManager::from_pkcs8_pem(&pem).context("failed to parse signing key")?
        }
        Err(_) => {
            info!("SIGNING_KEY_PEM not set, generating an ephemeral key pair");
            KeyManager::new()
        }
    };
    let key_manager = Arc::new(key_manager);

    // Relying parties need this to verify published assertions.
    info!(
        "issuer public key:\n{}",
        key_manager.public_key_pem().context("failed to export public key")?
    );

    let signer = AssertionSigner::new(
        key_manager,
        base_authority.clone(),
        chrono::Duration::hours(ASSERTION_VALIDITY_HOURS),
    );
    let store = Arc::new(MemoryStatusStore::new());
    let api_server = ApiServer::new(store, signer, auth_username, auth_password);

    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid BIND_ADDR {}", bind_addr))?;
    info!("issuing assertions under {}", base_authority);

    api_server.run(addr).await
}
