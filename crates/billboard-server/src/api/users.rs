// ABOUTME: User API handlers for listing, registering, and reading a user with their announcements.
// ABOUTME: Registration returns the existing user when the email is already known.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use billboard_core::NewUser;

use super::{message, parse_id, rejected};
use crate::app_state::SharedState;

/// GET /api/v1/users
pub async fn list_users(State(state): State<SharedState>) -> Response {
    match state.users.list().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => {
            tracing::error!("failed to list users: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /api/v1/users
pub async fn register_user(
    State(state): State<SharedState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Response {
    let Json(new_user) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match state.users.register(new_user).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => {
            tracing::error!("failed to register user: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/v1/users/{id}
pub async fn get_user(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_id(&id) else {
        return message(StatusCode::NOT_FOUND, "User not found");
    };

    match state.users.get_detail(id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) if e.is_not_found() => message(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            tracing::error!("failed to load user {}: {}", id, e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
