use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::{
    routes::models::{LogErrorRequest, PurgeRequest},
    services::account::{delete_user_data, delete_user_row},
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::UserRole;

/// Persist a client crash report. Always acknowledges: a crash reporter
/// that can itself fail just loses the report.
pub async fn log_error(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LogErrorRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    // Attach the user when a valid session is present, otherwise log anonymously.
    let user_id = match require_bearer(&headers) {
        Ok(token) => state.authenticate(&token).await.ok().map(|(user, _)| user.id),
        Err(_) => None,
    };

    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO error_logs (user_id, message, context, user_agent, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&req.message)
    .bind(&req.context)
    .bind(&req.user_agent)
    .bind(&now)
    .execute(state.db_pool())
    .await;

    if let Err(error) = result {
        warn!(%error, "failed to persist client error log");
    }

    (StatusCode::CREATED, Json(json!({ "success": true })))
}

/// Self-service account deletion: cascade all data, then soft-delete the
/// user row so the id stays reserved.
pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let report = delete_user_data(state.db_pool(), &user).await;
    state.users().delete(user.id).await?;

    Ok(Json(json!({ "success": true, "report": report })))
}

/// Admin-only purge of any account by email, hard-deleting the user row.
pub async fn admin_purge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PurgeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (caller, _) = state.authenticate(&token).await?;

    if caller.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    let email = req.email.trim().to_lowercase();
    let target = state
        .users()
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("No user with that email"))?;

    let report = delete_user_data(state.db_pool(), &target).await;

    let deleted = delete_user_row(state.db_pool(), target.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user row: {}", e);
            ApiError::internal_server_error("Failed to delete user")
        })?;

    Ok(Json(json!({
        "success": true,
        "user_deleted": deleted > 0,
        "report": report
    })))
}
