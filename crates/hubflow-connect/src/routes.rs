//! Route definitions for the connection flow.

use crate::handlers;
use crate::state::ConnectState;
use axum::{
    Router,
    routing::{get, post},
};

/// Create the connection router.
pub fn create_router(state: ConnectState) -> Router {
    Router::new()
        .route("/api/ml/connect", get(handlers::connect))
        .route("/api/ml/callback", get(handlers::callback))
        .route("/api/ml/status", get(handlers::status))
        .route("/api/ml/disconnect", post(handlers::disconnect))
        .route("/api/ml/refresh", post(handlers::refresh))
        .with_state(state)
}
