// ABOUTME: REST API handler modules for announcements and users.
// ABOUTME: Holds the shared `{message}` error body used by every handler.

pub mod announcements;
pub mod users;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ulid::Ulid;

/// A JSON body of the form `{"message": ...}` with the given status.
pub fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "message": message.into() })),
    )
        .into_response()
}

/// A request the extractors could not read. Reported as a server error like
/// every other non-lookup failure, with the extractor's explanation.
pub(crate) fn rejected(reason: String) -> Response {
    tracing::error!("rejected request: {}", reason);
    message(StatusCode::INTERNAL_SERVER_ERROR, reason)
}

pub(crate) fn parse_id(raw: &str) -> Option<Ulid> {
    Ulid::from_string(raw).ok()
}
