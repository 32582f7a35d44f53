// ABOUTME: Route definitions for the billboard HTTP API.
// ABOUTME: Assembles announcement, user, and health routes with CORS and request tracing layers.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::SharedState;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/announcements",
            get(api::announcements::list_announcements)
                .post(api::announcements::create_announcement),
        )
        .route(
            "/api/v1/announcements/{id}",
            get(api::announcements::get_announcement)
                .patch(api::announcements::update_announcement)
                .delete(api::announcements::delete_announcement),
        )
        .route(
            "/api/v1/users",
            get(api::users::list_users).post(api::users::register_user),
        )
        .route("/api/v1/users/{id}", get(api::users::get_user))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
