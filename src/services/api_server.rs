// src/services/api_server.rs
//! API Server for the status assertion service.
//!
//! This module provides the REST interface over the status list core,
//! including signed assertion publication and authenticated status
//! mutation.
//!
//! The API is built using Axum and exposes:
//! - `GET  /api/status/:id?index=N` - build and sign an assertion for bit N
//! - `PUT  /api/status/:id/:index` - set a bit true and re-publish (basic auth)
//! - `DELETE /api/status/:id/:index` - set a bit false and re-publish (basic auth)
//! - `POST /api/status/:id` - add a new bit, returning its index (basic auth)
//! - `GET  /api/status` - list all status-list ids
//! - `POST /api/status` - create a new empty status list (basic auth)
//!
//! Read-modify-write cycles over a single status list are serialized by a
//! per-id lock so concurrent mutations never lose an update; operations on
//! different lists never contend.

use crate::errors::StatusError;
use crate::models::status_list::StatusList;
use crate::services::assertion_signer::AssertionSigner;
use crate::storage::status_store::StatusStore;
use crate::utils::codec;
use axum::{
    extract::{Path, Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// How long a single status store call may take before the whole
/// read-modify-write cycle is aborted as `StorageUnavailable`.
const STORE_TIMEOUT: Duration = Duration::from_secs(5);

// API request and response structures

/// Query parameters for requesting a signed assertion
#[derive(Deserialize)]
struct GetStatusQuery {
    index: usize,
}

/// Response for the add-status operation
#[derive(Serialize, Deserialize)]
struct AddStatusResponse {
    index: usize,
}

/// Response for status list creation
#[derive(Serialize, Deserialize)]
struct CreateStatusListResponse {
    #[serde(rename = "statusId")]
    status_id: String,
}

/// Error payload returned for any failed operation
#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// API server state containing all service dependencies
pub struct ApiServer {
    /// Capability for reading and writing encoded status lists
    store: Arc<dyn StatusStore>,

    /// Service that builds and signs status assertions
    signer: AssertionSigner,

    /// Credentials required by the basic-auth middleware
    auth_username: String,
    auth_password: String,

    /// Per-status-list write locks; at most one in-flight
    /// read-modify-write cycle per id
    write_locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    /// Time bound on a single store call
    store_timeout: Duration,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `store` - Status store capability
    /// * `signer` - Assertion signing service
    /// * `auth_username` / `auth_password` - basic-auth credentials for
    ///   mutating endpoints
    pub fn new(
        store: Arc<dyn StatusStore>,
        signer: AssertionSigner,
        auth_username: String,
        auth_password: String,
    ) -> Self {
        ApiServer {
            store,
            signer,
            auth_username,
            auth_password,
            write_locks: tokio::sync::Mutex::new(HashMap::new()),
            store_timeout: STORE_TIMEOUT,
        }
    }

    /// Overrides the store call time bound. Mainly useful for tests and
    /// deployments with unusually slow backends.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Builds the router with all API routes and the auth middleware.
    pub fn into_router(self) -> Router {
        let state = Arc::new(self);
        Router::new()
            .route(
                "/api/status",
                get(Self::list_statuses_handler).post(Self::create_status_list_handler),
            )
            .route(
                "/api/status/:status_id",
                get(Self::get_status_handler).post(Self::add_status_handler),
            )
            .route(
                "/api/status/:status_id/:index",
                put(Self::set_status_handler).delete(Self::delete_status_handler),
            )
            .layer(middleware::from_fn_with_state(
                state.clone(),
                Self::basic_auth,
            ))
            .with_state(state)
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:8000")
    pub async fn run(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.into_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }

    // =====================
    // Middleware
    // =====================

    /// Basic-auth guard for all mutating methods.
    ///
    /// GET requests pass through unauthenticated; PUT, POST, and DELETE
    /// require an `Authorization: Basic {base64}` header matching the
    /// configured credentials.
    async fn basic_auth(
        State(state): State<Arc<ApiServer>>,
        request: Request,
        next: Next,
    ) -> Response {
        if request.method() == Method::GET {
            return next.run(request).await;
        }

        let supplied = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Basic "));

        let expected = base64::encode(format!(
            "{}:{}",
            state.auth_username, state.auth_password
        ));

        match supplied {
            Some(credentials) if credentials == expected => next.run(request).await,
            Some(_) => {
                warn!("rejected request with invalid credentials");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "invalid credentials".into(),
                    }),
                )
                    .into_response()
            }
            None => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "authorization header required".into(),
                }),
            )
                .into_response(),
        }
    }

    // =====================
    // Assertion Publication Handlers
    // =====================

    /// Builds and signs a status assertion for one bit
    ///
    /// # Endpoint
    /// GET /api/status/:status_id?index=N
    ///
    /// # Responses
    /// - 200 OK: compact signed assertion token as the response body
    /// - 400 Bad Request: index missing or out of range
    /// - 404 Not Found: unknown status list
    async fn get_status_handler(
        Path(status_id): Path<String>,
        Query(query): Query<GetStatusQuery>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        info!(
            "assertion requested for status list {} index {}",
            status_id, query.index
        );

        let result = async {
            let list = state.load_list(&status_id).await?;
            state.signer.sign_assertion(&status_id, &list, query.index)
        }
        .await;

        match result {
            Ok(token) => (StatusCode::OK, token).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// Lists all status-list identifiers
    ///
    /// # Endpoint
    /// GET /api/status
    async fn list_statuses_handler(State(state): State<Arc<ApiServer>>) -> Response {
        match state.with_store(|store| store.list_ids()).await {
            Ok(ids) => (StatusCode::OK, Json(ids)).into_response(),
            Err(e) => error_response(e),
        }
    }

    // =====================
    // Status Mutation Handlers
    // =====================

    /// Sets a status bit to true and re-publishes the list
    ///
    /// # Endpoint
    /// PUT /api/status/:status_id/:index
    async fn set_status_handler(
        Path((status_id, index)): Path<(String, usize)>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        match state
            .mutate_list(&status_id, |list| list.set_status(index, true))
            .await
        {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => error_response(e),
        }
    }

    /// Clears a status bit and re-publishes the list
    ///
    /// # Endpoint
    /// DELETE /api/status/:status_id/:index
    async fn delete_status_handler(
        Path((status_id, index)): Path<(String, usize)>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        match state
            .mutate_list(&status_id, |list| list.set_status(index, false))
            .await
        {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => error_response(e),
        }
    }

    /// Adds a new status bit (initially false) and returns its index
    ///
    /// # Endpoint
    /// POST /api/status/:status_id
    async fn add_status_handler(
        Path(status_id): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        match state
            .mutate_list(&status_id, |list| Ok(list.add_status(false)))
            .await
        {
            Ok(index) => (StatusCode::OK, Json(AddStatusResponse { index })).into_response(),
            Err(e) => error_response(e),
        }
    }

    /// Creates a new, empty status list
    ///
    /// # Endpoint
    /// POST /api/status
    async fn create_status_list_handler(State(state): State<Arc<ApiServer>>) -> Response {
        let result = async {
            let encoded = codec::encode(StatusList::new().as_bytes())?;
            state
                .with_store(move |store| store.create(encoded.into_bytes()))
                .await
        }
        .await;

        match result {
            Ok(status_id) => {
                info!("created status list {}", status_id);
                (
                    StatusCode::OK,
                    Json(CreateStatusListResponse { status_id }),
                )
                    .into_response()
            }
            Err(e) => error_response(e),
        }
    }

    // =====================
    // Core plumbing
    // =====================

    /// Runs one store operation on the blocking pool under a time bound.
    ///
    /// A call that outlives the bound fails the surrounding cycle with
    /// [`StatusError::StorageUnavailable`]. Blocking store calls cannot be
    /// cancelled, so the stalled call is waited out before the error is
    /// returned: the result is discarded, but the caller (and the per-id
    /// write lock it holds) does not move on while a late write could
    /// still land and clobber a subsequent cycle's update.
    async fn with_store<T, F>(&self, op: F) -> Result<T, StatusError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StatusStore) -> Result<T, StatusError> + Send + 'static,
    {
        let store = self.store.clone();
        let mut call = tokio::task::spawn_blocking(move || op(store.as_ref()));
        match tokio::time::timeout(self.store_timeout, &mut call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!("store task failed: {}", join_error);
                Err(StatusError::StorageUnavailable)
            }
            Err(_) => {
                warn!("store call exceeded {:?}, draining before abort", self.store_timeout);
                if let Err(join_error) = (&mut call).await {
                    error!("stalled store task failed: {}", join_error);
                }
                Err(StatusError::StorageUnavailable)
            }
        }
    }

    /// Fetches and decodes the current snapshot of a status list.
    async fn load_list(&self, status_id: &str) -> Result<StatusList, StatusError> {
        let id = status_id.to_string();
        let stored = self.with_store(move |store| store.get(&id)).await?;
        let encoded = String::from_utf8(stored)
            .map_err(|e| StatusError::Storage(format!("stored bytes are not text: {}", e)))?;
        Ok(StatusList::from_bytes(codec::decode(&encoded)?))
    }

    /// Runs a full read-modify-write cycle over one status list.
    ///
    /// The per-id lock is held across get, decode, mutation, encode, and
    /// put. If any step fails the cycle aborts without a partial write;
    /// a timed-out store call is drained inside [`Self::with_store`]
    /// before the lock releases, so it can never interleave with a later
    /// cycle.
    async fn mutate_list<T>(
        &self,
        status_id: &str,
        mutation: impl FnOnce(&mut StatusList) -> Result<T, StatusError>,
    ) -> Result<T, StatusError> {
        let _guard = self.write_lock(status_id).await;

        let mut list = self.load_list(status_id).await?;
        let outcome = mutation(&mut list)?;

        let encoded = codec::encode(list.as_bytes())?;
        let id = status_id.to_string();
        self.with_store(move |store| store.put(&id, encoded.into_bytes()))
            .await?;

        Ok(outcome)
    }

    /// Acquires the write lock for one status list id.
    ///
    /// Entries with no outstanding guard or waiter (strong count of one:
    /// only the map's reference left) are swept on each acquisition, so
    /// the map tracks in-flight cycles rather than every id ever touched.
    async fn write_lock(&self, status_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.write_locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(status_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Maps a core error onto its HTTP representation.
fn error_response(err: StatusError) -> Response {
    let status = match err {
        StatusError::IndexOutOfRange | StatusError::MalformedToken(_) => StatusCode::BAD_REQUEST,
        StatusError::NotFound => StatusCode::NOT_FOUND,
        StatusError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
