use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use sqlx::Row;

use crate::{
    routes::models::{CreateReminderRequest, ReminderResponse, RemindersResponse},
    services::access::require_unit_landlord,
    services::invites::payment_reminder_email,
    util::{format_kroner, require_bearer},
    ApiError, AppState,
};
use utleie_database::{new_public_id, NotificationType, PaymentReminder, ReminderStatus};

pub async fn list_reminders(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RemindersResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;

    let reminders = sqlx::query_as::<_, PaymentReminder>(
        "SELECT * FROM payment_reminders WHERE unit_id = ? ORDER BY due_date DESC",
    )
    .bind(unit_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch reminders: {}", e);
        ApiError::internal_server_error("Failed to fetch reminders")
    })?;

    Ok(Json(RemindersResponse { reminders }))
}

pub async fn create_reminder(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateReminderRequest>,
) -> Result<Json<ReminderResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;

    if req.due_date.trim().is_empty() {
        return Err(ApiError::bad_request("A due date is required"));
    }

    let (tenant_id, monthly_rent_ore): (Option<i64>, i64) =
        sqlx::query_as("SELECT tenant_id, monthly_rent_ore FROM rental_units WHERE id = ?")
            .bind(unit_db_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch unit: {}", e);
                ApiError::internal_server_error("Failed to create reminder")
            })?;

    let tenant_id =
        tenant_id.ok_or_else(|| ApiError::conflict("Unit has no tenant to remind"))?;

    let amount = req.amount_ore.unwrap_or(monthly_rent_ore);
    if amount <= 0 {
        return Err(ApiError::bad_request("Amount must be positive"));
    }

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO payment_reminders
            (public_id, unit_id, tenant_id, amount_ore, due_date, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(tenant_id)
    .bind(amount)
    .bind(req.due_date.trim())
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create reminder: {}", e);
        ApiError::internal_server_error("Failed to create reminder")
    })?;

    let reminder = fetch_reminder(&state, &public_id, user.id).await?;
    Ok(Json(ReminderResponse { reminder }))
}

/// Dispatch a reminder to the tenant by email and in-app notification.
pub async fn send_reminder(
    State(state): State<AppState>,
    Path(reminder_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReminderResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let reminder = fetch_reminder(&state, &reminder_id, user.id).await?;
    if reminder.status == ReminderStatus::Paid {
        return Err(ApiError::conflict("Reminder is already settled"));
    }

    let row = sqlx::query(
        r#"
        SELECT u.name AS unit_name, t.email AS tenant_email
        FROM rental_units u
        JOIN users t ON t.id = ?
        WHERE u.id = ?
        "#,
    )
    .bind(reminder.tenant_id)
    .bind(reminder.unit_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch reminder context: {}", e);
        ApiError::internal_server_error("Failed to send reminder")
    })?;

    let unit_name: String = row.get("unit_name");
    let tenant_email: Option<String> = row.try_get("tenant_email").unwrap_or(None);

    if let Some(email) = tenant_email {
        state
            .mailer()
            .dispatch(payment_reminder_email(
                &email,
                &unit_name,
                reminder.amount_ore,
                &reminder.due_date,
            ))
            .await;
    }

    state
        .notifications()
        .notify(
            reminder.tenant_id,
            NotificationType::PaymentReminder,
            "Betalingspåminnelse",
            &format!(
                "Utestående husleie for {}: {} med forfall {}.",
                unit_name,
                format_kroner(reminder.amount_ore),
                reminder.due_date
            ),
        )
        .await;

    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE payment_reminders SET status = 'sent', sent_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(&now)
    .bind(reminder.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to mark reminder sent: {}", e);
        ApiError::internal_server_error("Failed to send reminder")
    })?;

    let reminder = fetch_reminder(&state, &reminder_id, user.id).await?;
    Ok(Json(ReminderResponse { reminder }))
}

/// Settle a reminder and book the payment as rent income.
pub async fn mark_reminder_paid(
    State(state): State<AppState>,
    Path(reminder_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ReminderResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let reminder = fetch_reminder(&state, &reminder_id, user.id).await?;
    if reminder.status == ReminderStatus::Paid {
        return Err(ApiError::conflict("Reminder is already settled"));
    }

    let now = Utc::now().to_rfc3339();
    let today = &now[..10];

    let mut tx = state.db_pool().begin().await.map_err(|e| {
        tracing::error!("Failed to open transaction: {}", e);
        ApiError::internal_server_error("Failed to settle reminder")
    })?;

    sqlx::query("UPDATE payment_reminders SET status = 'paid', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(reminder.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to settle reminder: {}", e);
            ApiError::internal_server_error("Failed to settle reminder")
        })?;

    sqlx::query(
        r#"
        INSERT INTO financial_entries
            (public_id, unit_id, recorded_by, entry_type, category, amount_ore, entry_date, description, created_at, updated_at)
        VALUES (?, ?, ?, 'income', 'rent', ?, ?, 'Innbetalt etter påminnelse', ?, ?)
        "#,
    )
    .bind(new_public_id())
    .bind(reminder.unit_id)
    .bind(user.id)
    .bind(reminder.amount_ore)
    .bind(today)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to book payment: {}", e);
        ApiError::internal_server_error("Failed to settle reminder")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit settlement: {}", e);
        ApiError::internal_server_error("Failed to settle reminder")
    })?;

    let reminder = fetch_reminder(&state, &reminder_id, user.id).await?;
    Ok(Json(ReminderResponse { reminder }))
}

async fn fetch_reminder(
    state: &AppState,
    public_id: &str,
    user_id: i64,
) -> Result<PaymentReminder, ApiError> {
    sqlx::query_as::<_, PaymentReminder>(
        r#"
        SELECT r.* FROM payment_reminders r
        JOIN unit_landlords ul ON ul.unit_id = r.unit_id
        WHERE r.public_id = ? AND ul.user_id = ?
        "#,
    )
    .bind(public_id)
    .bind(user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch reminder: {}", e);
        ApiError::internal_server_error("Failed to fetch reminder")
    })?
    .ok_or_else(|| ApiError::not_found("Reminder not found"))
}
