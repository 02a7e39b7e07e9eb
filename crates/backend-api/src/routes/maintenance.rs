use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::{
    routes::models::{
        CompleteMaintenanceRequest, CreateMaintenanceRequest, TaskResponse, TasksResponse,
        UpdateMaintenanceRequest,
    },
    services::access::require_unit_access,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{new_public_id, MaintenanceTask, NotificationType, TaskStatus};

pub async fn list_tasks(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TasksResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;

    let tasks = sqlx::query_as::<_, MaintenanceTask>(
        "SELECT * FROM maintenance_tasks WHERE unit_id = ? ORDER BY created_at DESC",
    )
    .bind(unit_db_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch maintenance tasks: {}", e);
        ApiError::internal_server_error("Failed to fetch maintenance tasks")
    })?;

    Ok(Json(TasksResponse { tasks }))
}

pub async fn create_task(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateMaintenanceRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, access) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;

    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("A title is required"));
    }
    let priority = req.priority.as_deref().unwrap_or("medium");
    if !matches!(priority, "low" | "medium" | "high" | "urgent") {
        return Err(ApiError::bad_request(
            "Priority must be low, medium, high or urgent",
        ));
    }

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO maintenance_tasks
            (public_id, unit_id, reported_by, title, description, status, priority, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'open', ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(user.id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(priority)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create maintenance task: {}", e);
        ApiError::internal_server_error("Failed to create maintenance task")
    })?;

    // A tenant report pings every landlord of the unit.
    if !access.is_landlord() {
        let landlord_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM unit_landlords WHERE unit_id = ?",
        )
        .bind(unit_db_id)
        .fetch_all(state.db_pool())
        .await
        .unwrap_or_default();

        for landlord_id in landlord_ids {
            state
                .notifications()
                .notify(
                    landlord_id,
                    NotificationType::MaintenanceReported,
                    "Ny vedlikeholdssak",
                    &format!("Leietaker har meldt: {}", req.title.trim()),
                )
                .await;
        }
    }

    let task = fetch_task(&state, &public_id, user.id).await?;
    Ok(Json(TaskResponse { task }))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TaskResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let task = fetch_task(&state, &task_id, user.id).await?;
    Ok(Json(TaskResponse { task }))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateMaintenanceRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let task = fetch_task(&state, &task_id, user.id).await?;

    if let Some(status) = req.status.as_deref() {
        // Completion and its rollback run through the dedicated routes so
        // the linked expense entry stays consistent.
        if !matches!(status, "open" | "in_progress") {
            return Err(ApiError::bad_request(
                "Status can only be set to open or in_progress here",
            ));
        }
        if task.status == TaskStatus::Completed {
            return Err(ApiError::conflict("Reopen the task before editing it"));
        }
    }
    if let Some(priority) = req.priority.as_deref() {
        if !matches!(priority, "low" | "medium" | "high" | "urgent") {
            return Err(ApiError::bad_request(
                "Priority must be low, medium, high or urgent",
            ));
        }
    }

    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE maintenance_tasks
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            priority = COALESCE(?, priority),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.priority)
    .bind(&req.status)
    .bind(&now)
    .bind(task.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update maintenance task: {}", e);
        ApiError::internal_server_error("Failed to update maintenance task")
    })?;

    let task = fetch_task(&state, &task_id, user.id).await?;
    Ok(Json(TaskResponse { task }))
}

/// Complete a task. A cost spawns a linked expense entry in the books.
pub async fn complete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CompleteMaintenanceRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let task = fetch_task(&state, &task_id, user.id).await?;
    require_landlord_of_task(&state, &task, user.id).await?;

    if task.status == TaskStatus::Completed {
        return Err(ApiError::conflict("Task is already completed"));
    }
    if let Some(cost) = req.cost_ore {
        if cost < 0 {
            return Err(ApiError::bad_request("Cost cannot be negative"));
        }
    }

    let now = Utc::now().to_rfc3339();
    let today = &now[..10];

    let mut tx = state.db_pool().begin().await.map_err(|e| {
        tracing::error!("Failed to open transaction: {}", e);
        ApiError::internal_server_error("Failed to complete task")
    })?;

    let mut financial_entry_id: Option<i64> = None;
    if let Some(cost) = req.cost_ore.filter(|cost| *cost > 0) {
        let entry_public_id = new_public_id();
        let entry_id = sqlx::query(
            r#"
            INSERT INTO financial_entries
                (public_id, unit_id, recorded_by, entry_type, category, amount_ore, entry_date, description, maintenance_task_id, created_at, updated_at)
            VALUES (?, ?, ?, 'expense', 'maintenance', ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry_public_id)
        .bind(task.unit_id)
        .bind(user.id)
        .bind(cost)
        .bind(today)
        .bind(format!("Vedlikehold: {}", task.title))
        .bind(task.id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create linked expense: {}", e);
            ApiError::internal_server_error("Failed to complete task")
        })?
        .last_insert_rowid();
        financial_entry_id = Some(entry_id);
    }

    sqlx::query(
        r#"
        UPDATE maintenance_tasks
        SET status = 'completed', cost_ore = ?, financial_entry_id = ?, completed_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.cost_ore)
    .bind(financial_entry_id)
    .bind(&now)
    .bind(&now)
    .bind(task.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to complete task: {}", e);
        ApiError::internal_server_error("Failed to complete task")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit completion: {}", e);
        ApiError::internal_server_error("Failed to complete task")
    })?;

    if task.reported_by != user.id {
        state
            .notifications()
            .notify(
                task.reported_by,
                NotificationType::MaintenanceCompleted,
                "Vedlikeholdssak fullført",
                &format!("Saken «{}» er fullført.", task.title),
            )
            .await;
    }

    let task = fetch_task(&state, &task_id, user.id).await?;
    Ok(Json(TaskResponse { task }))
}

/// Revert a completion. The spawned expense entry, if any, goes with it.
pub async fn reopen_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TaskResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let task = fetch_task(&state, &task_id, user.id).await?;
    require_landlord_of_task(&state, &task, user.id).await?;

    if task.status != TaskStatus::Completed {
        return Err(ApiError::conflict("Only completed tasks can be reopened"));
    }

    let now = Utc::now().to_rfc3339();
    let mut tx = state.db_pool().begin().await.map_err(|e| {
        tracing::error!("Failed to open transaction: {}", e);
        ApiError::internal_server_error("Failed to reopen task")
    })?;

    if let Some(entry_id) = task.financial_entry_id {
        sqlx::query("DELETE FROM financial_entries WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete linked expense: {}", e);
                ApiError::internal_server_error("Failed to reopen task")
            })?;
    }

    sqlx::query(
        r#"
        UPDATE maintenance_tasks
        SET status = 'open', cost_ore = NULL, financial_entry_id = NULL, completed_at = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&now)
    .bind(task.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to reopen task: {}", e);
        ApiError::internal_server_error("Failed to reopen task")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit reopen: {}", e);
        ApiError::internal_server_error("Failed to reopen task")
    })?;

    let task = fetch_task(&state, &task_id, user.id).await?;
    Ok(Json(TaskResponse { task }))
}

async fn fetch_task(
    state: &AppState,
    public_id: &str,
    user_id: i64,
) -> Result<MaintenanceTask, ApiError> {
    sqlx::query_as::<_, MaintenanceTask>(
        r#"
        SELECT t.* FROM maintenance_tasks t
        JOIN rental_units u ON u.id = t.unit_id
        LEFT JOIN unit_landlords ul ON ul.unit_id = u.id AND ul.user_id = ?
        WHERE t.public_id = ? AND (ul.id IS NOT NULL OR u.tenant_id = ?)
        "#,
    )
    .bind(user_id)
    .bind(public_id)
    .bind(user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch maintenance task: {}", e);
        ApiError::internal_server_error("Failed to fetch maintenance task")
    })?
    .ok_or_else(|| ApiError::not_found("Task not found"))
}

async fn require_landlord_of_task(
    state: &AppState,
    task: &MaintenanceTask,
    user_id: i64,
) -> Result<(), ApiError> {
    let is_landlord: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM unit_landlords WHERE unit_id = ? AND user_id = ?",
    )
    .bind(task.unit_id)
    .bind(user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check task access: {}", e);
        ApiError::internal_server_error("Failed to check task access")
    })?;

    if is_landlord.is_none() {
        return Err(ApiError::forbidden("Only landlords can do this"));
    }
    Ok(())
}
