use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    routes::models::{CreateEventRequest, EventResponse, EventsResponse},
    services::access::require_unit_access,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{new_public_id, CalendarEvent};

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let from = query.from.unwrap_or_else(|| "0000".to_string());
    let to = query.to.unwrap_or_else(|| "9999".to_string());

    let events = sqlx::query_as::<_, CalendarEvent>(
        r#"
        SELECT * FROM calendar_events
        WHERE user_id = ? AND starts_at >= ? AND starts_at <= ?
        ORDER BY starts_at ASC
        "#,
    )
    .bind(user.id)
    .bind(&from)
    .bind(&to)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch events: {}", e);
        ApiError::internal_server_error("Failed to fetch events")
    })?;

    Ok(Json(EventsResponse { events }))
}

pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<EventResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("A title is required"));
    }
    if req.starts_at.trim().is_empty() {
        return Err(ApiError::bad_request("A start time is required"));
    }
    let event_type = req.event_type.as_deref().unwrap_or("other");
    if !matches!(
        event_type,
        "viewing" | "move_in" | "move_out" | "inspection" | "other"
    ) {
        return Err(ApiError::bad_request("Unknown event type"));
    }

    let unit_db_id = match req.unit_id.as_deref() {
        Some(unit_public_id) => {
            let (id, _) = require_unit_access(state.db_pool(), unit_public_id, user.id).await?;
            Some(id)
        }
        None => None,
    };

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO calendar_events
            (public_id, user_id, unit_id, title, description, event_type, starts_at, ends_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(user.id)
    .bind(unit_db_id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(event_type)
    .bind(req.starts_at.trim())
    .bind(&req.ends_at)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create event: {}", e);
        ApiError::internal_server_error("Failed to create event")
    })?;

    let event =
        sqlx::query_as::<_, CalendarEvent>("SELECT * FROM calendar_events WHERE public_id = ?")
            .bind(&public_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch created event: {}", e);
                ApiError::internal_server_error("Failed to create event")
            })?;

    Ok(Json(EventResponse { event }))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let result = sqlx::query("DELETE FROM calendar_events WHERE public_id = ? AND user_id = ?")
        .bind(&event_id)
        .bind(user.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete event: {}", e);
            ApiError::internal_server_error("Failed to delete event")
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Event not found"));
    }

    Ok(())
}
