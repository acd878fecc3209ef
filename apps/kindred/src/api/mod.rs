//! # Kindred HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! The server owns one session and at most one live view graph. Requests
//! take turns on a single async mutex, so show/hide calls apply in arrival
//! order.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Dataset metrics and live view size
//! - `GET /persons/{id}/families` - Families as parent and as child
//! - `POST /view` - Build a view graph (`{"start": 1, "mode": "ancestors"}`)
//! - `GET /view` - Snapshot of the live view
//! - `POST /view/show` - Show the family behind a node (`{"view_id": 4}`)
//! - `POST /view/hide` - Collapse the family behind a node
//!
//! ## CORS
//!
//! Allowed origins come from `server.cors_origins` in the config file, or
//! from `KINDRED_CORS_ORIGINS` (comma-separated, or `*` for all). With
//! neither set only localhost origins are allowed.

mod handlers;
mod types;

pub use handlers::{
    build_view_handler, families_handler, get_view_handler, health_handler, hide_family_handler,
    show_family_handler, status_for, status_handler,
};
pub use types::{
    BuildViewRequest, ErrorResponse, FamiliesResponse, FamilyActionRequest, HealthResponse,
    StatusResponse, ViewResponse, ViewSummary,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use kindred_core::{KindredError, Session, ViewGraph};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit (2 MB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// The session and the view graph built from it.
#[derive(Debug)]
pub struct ViewState {
    pub session: Session,
    pub graph: Option<ViewGraph>,
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub view: Arc<Mutex<ViewState>>,
    /// Allowed CORS origins; empty means localhost only.
    pub cors_origins: Arc<[String]>,
}

impl AppState {
    /// Create new app state with a session and no view.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            view: Arc::new(Mutex::new(ViewState {
                session,
                graph: None,
            })),
            cors_origins: Arc::from(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::from(origins);
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: any origin
/// - empty: localhost only
/// - otherwise: the listed origins; invalid entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS: Allowing ALL origins. Do not expose this server publicly.");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        build_localhost_cors()
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.cors_origins);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/persons/{id}/families", get(handlers::families_handler))
        .route(
            "/view",
            get(handlers::get_view_handler).post(handlers::build_view_handler),
        )
        .route("/view/show", post(handlers::show_family_handler))
        .route("/view/hide", post(handlers::hide_family_handler))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(
    addr: &str,
    session: Session,
    cors_origins: Vec<String>,
) -> Result<(), KindredError> {
    let state = AppState::new(session).with_cors_origins(cors_origins);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KindredError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Kindred HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KindredError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
