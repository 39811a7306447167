//! Request handlers for the connection routes.

use axum::Json;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use crate::account::{AccountError, ConnectionStatus};
use crate::exchanger::{CallbackParams, to_response};
use crate::state::ConnectState;

/// `GET /api/ml/connect`: send the browser to the consent screen.
pub async fn connect(State(state): State<ConnectState>) -> Response {
    tracing::debug!("redirecting to marketplace authorization");
    state.initiator().redirect()
}

/// `GET /api/ml/callback`: exchange the code and store the tokens.
pub async fn callback(
    State(state): State<ConnectState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let params = CallbackParams::from_query(query.as_deref());
    let ctx = state.request_context(&headers);
    let result = state.exchanger().exchange(&params, &ctx).await;
    to_response(&result, state.landing_page())
}

/// `GET /api/ml/status`
pub async fn status(
    State(state): State<ConnectState>,
    headers: HeaderMap,
) -> Result<Json<ConnectionStatus>, AccountError> {
    let ctx = state.request_context(&headers);
    Ok(Json(state.accounts().status(&ctx).await?))
}

/// `POST /api/ml/disconnect`
pub async fn disconnect(
    State(state): State<ConnectState>,
    headers: HeaderMap,
) -> Result<StatusCode, AccountError> {
    let ctx = state.request_context(&headers);
    state.accounts().disconnect(&ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/ml/refresh`
pub async fn refresh(
    State(state): State<ConnectState>,
    headers: HeaderMap,
) -> Result<Json<ConnectionStatus>, AccountError> {
    let ctx = state.request_context(&headers);
    Ok(Json(state.accounts().refresh(&ctx).await?))
}
