use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    routes::models::{MarkThreadReadRequest, MessageResponse, MessagesResponse, SendMessageRequest},
    services::access::{require_unit_access, UnitAccess},
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{new_public_id, ChatMessage, NotificationType};

pub async fn list_messages(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessagesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;

    let messages = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE unit_id = ? ORDER BY created_at ASC",
    )
    .bind(unit_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch messages: {}", e);
        ApiError::internal_server_error("Failed to fetch messages")
    })?;

    Ok(Json(MessagesResponse { messages }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, access) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;

    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Message content cannot be empty"));
    }

    // The thread is between the tenant and the unit's primary landlord.
    let (landlord_id, tenant_id): (i64, Option<i64>) =
        sqlx::query_as("SELECT landlord_id, tenant_id FROM rental_units WHERE id = ?")
            .bind(unit_db_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch unit: {}", e);
                ApiError::internal_server_error("Failed to send message")
            })?;

    let recipient_id = match access {
        UnitAccess::Tenant => landlord_id,
        UnitAccess::Landlord(_) => tenant_id
            .ok_or_else(|| ApiError::conflict("Unit has no tenant to message"))?,
    };

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO chat_messages (public_id, unit_id, sender_id, recipient_id, content, read, created_at)
        VALUES (?, ?, ?, ?, ?, false, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(user.id)
    .bind(recipient_id)
    .bind(req.content.trim())
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to send message: {}", e);
        ApiError::internal_server_error("Failed to send message")
    })?;

    state
        .notifications()
        .notify(
            recipient_id,
            NotificationType::MessageReceived,
            "Ny melding",
            &format!(
                "Du har fått en ny melding fra {}.",
                user.display_name.as_deref().unwrap_or("motparten")
            ),
        )
        .await;

    let message = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE public_id = ?",
    )
    .bind(&public_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch sent message: {}", e);
        ApiError::internal_server_error("Failed to send message")
    })?;

    Ok(Json(MessageResponse { message }))
}

/// Mark every message addressed to the caller in a unit thread as read.
pub async fn mark_thread_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MarkThreadReadRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_access(state.db_pool(), &req.unit_id, user.id).await?;

    let result = sqlx::query(
        "UPDATE chat_messages SET read = true WHERE unit_id = ? AND recipient_id = ? AND read = false",
    )
    .bind(unit_db_id)
    .bind(user.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to mark thread read: {}", e);
        ApiError::internal_server_error("Failed to mark thread read")
    })?;

    Ok(Json(json!({ "updated": result.rows_affected() })))
}
