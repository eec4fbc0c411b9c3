//! DisputeDB HTTP server.
//!
//! Maps the idempotent REST API onto a [`RecordStore`]:
//!
//! | Route | Semantics |
//! |---|---|
//! | `GET /chargebacks` | list all records |
//! | `POST /chargebacks/:id` | create once; retries get the stored record |
//! | `PUT /chargebacks/:id` | replace; skips the write if nothing changed |
//! | `DELETE /chargebacks/:id` | converge on absence |
//!
//! CORS is permissive so a browser frontend served from another origin
//! can reach the API, with the `X-Idempotency-Write` header exposed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod wire;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use disputedb_core::RecordStore;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The record store every request runs against.
    pub store: RecordStore,
}

/// Builds the application router over `store`.
pub fn router(store: RecordStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .expose_headers([handlers::IDEMPOTENCY_WRITE.clone()]);

    Router::new()
        .route("/chargebacks", get(handlers::list))
        .route("/chargebacks/:id", post(handlers::create))
        .route("/chargebacks/:id", put(handlers::update))
        .route("/chargebacks/:id", delete(handlers::delete))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { store })
}
