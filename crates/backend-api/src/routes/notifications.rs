use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    routes::models::{NotificationResponse, NotificationsResponse},
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// Get user notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let unread_only = query.unread_only.unwrap_or(false);
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let notifications = state
        .notifications()
        .find_by_user_id(user.id, unread_only, limit, offset)
        .await?;

    Ok(Json(NotificationsResponse { notifications }))
}

// Get unread notification count
pub async fn get_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let count = state.notifications().unread_count(user.id).await?;

    Ok(Json(serde_json::json!({ "unread_count": count })))
}

// Mark one notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<NotificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let notification = state
        .notifications()
        .mark_read(notification_id, user.id)
        .await?;

    Ok(Json(NotificationResponse { notification }))
}

// Mark everything as read
pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let updated = state.notifications().mark_all_read(user.id).await?;

    Ok(Json(serde_json::json!({ "updated": updated })))
}
