//! Notification preference handlers.

use axum::Json;
use axum::extract::State;

use bizhub_entity::notification::{DefaultThreshold, NotificationPreference};

use crate::dto::request::UpdatePreferencesRequest;
use crate::dto::response::ApiResponse;
use crate::dto::validated;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/notifications/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<NotificationPreference>>>, ApiError> {
    let prefs = state
        .notifications
        .preferences
        .list_for_user(auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(prefs)))
}

/// PUT /api/notifications/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<ApiResponse<Vec<NotificationPreference>>>, ApiError> {
    let req = validated(req)?;
    let prefs = state
        .notifications
        .preferences
        .update(auth.user_id, req.preferences)
        .await?;
    Ok(Json(ApiResponse::ok(prefs)))
}

/// GET /api/notifications/preferences/defaults
pub async fn default_thresholds(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<ApiResponse<&'static [DefaultThreshold]>> {
    Json(ApiResponse::ok(
        state.notifications.preferences.default_thresholds(),
    ))
}
