// ABOUTME: Announcement API handlers: paged listing, detail, create, update, and delete.
// ABOUTME: Writes go through the consistency manager so the creator's set stays in step.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{ACCESS_CONTROL_EXPOSE_HEADERS, HeaderName};
use axum::response::{IntoResponse, Response};
use billboard_core::{AnnouncementFields, AnnouncementPatch, ListParams};
use serde::Deserialize;

use super::{message, parse_id, rejected};
use crate::app_state::SharedState;

const TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// Request body for creating an announcement on behalf of the user with `email`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub description: String,
    pub announcement_type: String,
    pub photo: String,
    pub email: String,
}

/// Request body for updating an announcement. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub announcement_type: Option<String>,
    pub photo: Option<String>,
}

/// GET /api/v1/announcements - Filtered, sorted page plus the total match count.
pub async fn list_announcements(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match state.announcements.list(&params.into_query()).await {
        Ok((page, total)) => (
            [
                (TOTAL_COUNT, total.to_string()),
                (ACCESS_CONTROL_EXPOSE_HEADERS, TOTAL_COUNT.to_string()),
            ],
            Json(page),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to list announcements: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/v1/announcements/{id} - Detail with the creator populated.
pub async fn get_announcement(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return message(StatusCode::NOT_FOUND, "Announcement not found");
    };

    match state.announcements.get_by_id(id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) if e.is_not_found() => message(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => {
            tracing::error!("failed to load announcement {}: {}", id, e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /api/v1/announcements - Create an announcement and link it to its creator.
pub async fn create_announcement(
    State(state): State<SharedState>,
    body: Result<Json<CreateAnnouncementRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let fields = AnnouncementFields {
        title: req.title,
        description: req.description,
        announcement_type: req.announcement_type,
    };

    match state
        .consistency
        .create_announcement_for_user(&req.email, fields, &req.photo)
        .await
    {
        Ok(_) => message(StatusCode::OK, "Announcement created successfully"),
        Err(e) => {
            tracing::error!("failed to create announcement for {}: {}", req.email, e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// PATCH /api/v1/announcements/{id} - Update content and optionally the photo.
pub async fn update_announcement(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateAnnouncementRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return rejected(rejection.body_text()),
    };
    let Some(id) = parse_id(&id) else {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Announcement not found");
    };

    let patch = AnnouncementPatch {
        title: req.title,
        description: req.description,
        announcement_type: req.announcement_type,
    };

    match state
        .announcements
        .update_by_id(id, patch, req.photo.as_deref())
        .await
    {
        Ok(_) => message(StatusCode::OK, "Announcement updated successfully"),
        Err(e) => {
            tracing::error!("failed to update announcement {}: {}", id, e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// DELETE /api/v1/announcements/{id} - Delete and unlink from the creator.
/// A missing announcement is reported as a server error, like every other failure.
pub async fn delete_announcement(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Announcement not found");
    };

    match state.consistency.delete_announcement(id).await {
        Ok(()) => message(StatusCode::OK, "Announcement deleted successfully"),
        Err(e) => {
            tracing::error!("failed to delete announcement {}: {}", id, e);
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
