//! Admin notification handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};

use bizhub_auth::{NotificationPermission, RbacEnforcer};
use bizhub_core::error::AppError;
use bizhub_entity::notification::NotificationStatistics;

use crate::dto::request::{BroadcastNotificationRequest, StatisticsQuery};
use crate::dto::response::{ApiResponse, FanOutResponse};
use crate::dto::validated;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/admin/notifications/broadcast
///
/// The caller's role is checked before the body is parsed, so non-admins
/// get 403 whatever they send.
pub async fn broadcast(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<BroadcastNotificationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FanOutResponse>>, ApiError> {
    RbacEnforcer::new().require_permission(&auth.context().role, NotificationPermission::Broadcast)?;
    let Json(req) = body.map_err(|e| AppError::validation(e.body_text()))?;
    let req = validated(req)?;
    let outcome = state
        .notifications
        .admin
        .broadcast(auth.context(), req.into())
        .await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// POST /api/admin/notifications/test
pub async fn send_test(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<FanOutResponse>>, ApiError> {
    let outcome = state.notifications.admin.send_test(auth.context()).await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// GET /api/admin/notifications/statistics
pub async fn statistics(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<ApiResponse<NotificationStatistics>>, ApiError> {
    let stats = state
        .notifications
        .admin
        .statistics(auth.context(), query.from, query.to)
        .await?;
    Ok(Json(ApiResponse::ok(stats)))
}
