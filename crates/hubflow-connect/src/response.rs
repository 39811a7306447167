//! Response helpers shared by the handlers.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// `302 Found` to `location`.
///
/// `axum::response::Redirect` only offers 303/307/308; the provider and the
/// frontend both expect a plain 302.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Append `{flag}=true` to the landing page, keeping any existing query.
pub fn landing_with_flag(landing_page: &str, flag: &str) -> String {
    let separator = if landing_page.contains('?') { '&' } else { '?' };
    format!("{landing_page}{separator}{flag}=true")
}
