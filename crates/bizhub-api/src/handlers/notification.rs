//! Notification handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use bizhub_core::types::pagination::PageResponse;
use bizhub_entity::notification::UserNotificationView;
use bizhub_service::{MarkAllReadResult, MarkReadResult};

use crate::dto::request::ListNotificationsQuery;
use crate::dto::response::{ApiResponse, CountResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, parse_uuid};
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ApiResponse<PageResponse<UserNotificationView>>>, ApiError> {
    let page = query.page_request(state.config.notifications.default_page_size);
    let result = state
        .notifications
        .read_state
        .list(auth.user_id, &page, query.unread_only)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state
        .notifications
        .read_state
        .unread_count(auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MarkReadResult>>, ApiError> {
    let id = parse_uuid(&id)?;
    let result = state
        .notifications
        .read_state
        .mark_as_read(id, auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MarkAllReadResult>>, ApiError> {
    let result = state
        .notifications
        .read_state
        .mark_all_as_read(auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// DELETE /api/notifications/{id}
pub async fn hide(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = parse_uuid(&id)?;
    state.notifications.read_state.hide(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new(
        "Notification hidden",
    ))))
}
