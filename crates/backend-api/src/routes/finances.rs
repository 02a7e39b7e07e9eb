use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::{
    routes::models::{CreateFinancialEntryRequest, EntriesResponse, EntryResponse},
    services::access::{require_unit_access, require_unit_landlord},
    services::tax::{self, TaxEstimate},
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{new_public_id, FinancialEntry, LettingKind};

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list_entries(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, access) = require_unit_access(state.db_pool(), &unit_id, user.id).await?;
    if !access.is_landlord() {
        return Err(ApiError::forbidden("Only landlords can view the books"));
    }

    let from = range.from.unwrap_or_else(|| "0000-01-01".to_string());
    let to = range.to.unwrap_or_else(|| "9999-12-31".to_string());

    let entries = sqlx::query_as::<_, FinancialEntry>(
        r#"
        SELECT * FROM financial_entries
        WHERE unit_id = ? AND entry_date >= ? AND entry_date <= ?
        ORDER BY entry_date DESC, id DESC
        "#,
    )
    .bind(unit_db_id)
    .bind(&from)
    .bind(&to)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch financial entries: {}", e);
        ApiError::internal_server_error("Failed to fetch financial entries")
    })?;

    Ok(Json(EntriesResponse { entries }))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateFinancialEntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &unit_id, user.id).await?;

    if req.entry_type != "income" && req.entry_type != "expense" {
        return Err(ApiError::bad_request("entry_type must be income or expense"));
    }
    if req.amount_ore <= 0 {
        return Err(ApiError::bad_request("Amount must be positive"));
    }
    if req.category.trim().is_empty() {
        return Err(ApiError::bad_request("A category is required"));
    }
    if req.entry_date.trim().is_empty() {
        return Err(ApiError::bad_request("An entry date is required"));
    }

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO financial_entries
            (public_id, unit_id, recorded_by, entry_type, category, amount_ore, entry_date, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(unit_db_id)
    .bind(user.id)
    .bind(&req.entry_type)
    .bind(req.category.trim())
    .bind(req.amount_ore)
    .bind(req.entry_date.trim())
    .bind(&req.description)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create financial entry: {}", e);
        ApiError::internal_server_error("Failed to create financial entry")
    })?;

    let entry = sqlx::query_as::<_, FinancialEntry>(
        "SELECT * FROM financial_entries WHERE public_id = ?",
    )
    .bind(&public_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch created entry: {}", e);
        ApiError::internal_server_error("Failed to create financial entry")
    })?;

    Ok(Json(EntryResponse { entry }))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    // Visibility follows the unit the entry belongs to.
    let row = sqlx::query(
        r#"
        SELECT f.id FROM financial_entries f
        JOIN unit_landlords ul ON ul.unit_id = f.unit_id
        WHERE f.public_id = ? AND ul.user_id = ?
        "#,
    )
    .bind(&entry_id)
    .bind(user.id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch entry: {}", e);
        ApiError::internal_server_error("Failed to delete entry")
    })?
    .ok_or_else(|| ApiError::not_found("Entry not found"))?;

    let entry_db_id: i64 = row
        .try_get("id")
        .map_err(|_| ApiError::internal_server_error("Failed to delete entry"))?;

    sqlx::query("DELETE FROM financial_entries WHERE id = ?")
        .bind(entry_db_id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete entry: {}", e);
            ApiError::internal_server_error("Failed to delete entry")
        })?;

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CategorySum {
    pub entry_type: String,
    pub category: String,
    pub total_ore: i64,
}

#[derive(Debug, Serialize)]
pub struct UnitSummary {
    pub unit_id: String,
    pub unit_name: String,
    pub income_ore: i64,
    pub expense_ore: i64,
    pub net_ore: i64,
    pub by_category: Vec<CategorySum>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub from: String,
    pub to: String,
    pub units: Vec<UnitSummary>,
    pub total_income_ore: i64,
    pub total_expense_ore: i64,
    pub total_net_ore: i64,
}

/// Income/expense summary across every unit the caller manages.
pub async fn report_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let from = range.from.unwrap_or_else(|| "0000-01-01".to_string());
    let to = range.to.unwrap_or_else(|| "9999-12-31".to_string());

    let units = landlord_units(&state, user.id).await?;

    let mut summaries = Vec::with_capacity(units.len());
    let mut total_income = 0i64;
    let mut total_expense = 0i64;

    for (unit_db_id, unit_public_id, unit_name, _letting_kind) in units {
        let rows = sqlx::query(
            r#"
            SELECT entry_type, category, SUM(amount_ore) AS total_ore
            FROM financial_entries
            WHERE unit_id = ? AND entry_date >= ? AND entry_date <= ?
            GROUP BY entry_type, category
            ORDER BY entry_type, category
            "#,
        )
        .bind(unit_db_id)
        .bind(&from)
        .bind(&to)
        .fetch_all(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to aggregate entries: {}", e);
            ApiError::internal_server_error("Failed to build report")
        })?;

        let mut income = 0i64;
        let mut expense = 0i64;
        let mut by_category = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_type: String = row.get("entry_type");
            let category: String = row.get("category");
            let total_ore: i64 = row.get("total_ore");
            if entry_type == "income" {
                income += total_ore;
            } else {
                expense += total_ore;
            }
            by_category.push(CategorySum {
                entry_type,
                category,
                total_ore,
            });
        }

        total_income += income;
        total_expense += expense;
        summaries.push(UnitSummary {
            unit_id: unit_public_id,
            unit_name,
            income_ore: income,
            expense_ore: expense,
            net_ore: income - expense,
            by_category,
        });
    }

    Ok(Json(SummaryResponse {
        from,
        to,
        units: summaries,
        total_income_ore: total_income,
        total_expense_ore: total_expense,
        total_net_ore: total_income - total_expense,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TaxReportQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct UnitTaxReport {
    pub unit_id: String,
    pub unit_name: String,
    pub estimate: TaxEstimate,
}

#[derive(Debug, Serialize)]
pub struct TaxReportResponse {
    pub year: i32,
    pub units: Vec<UnitTaxReport>,
    pub total_estimated_tax_ore: i64,
}

/// Simplified Norwegian tax estimate for one calendar year.
pub async fn report_tax(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TaxReportQuery>,
) -> Result<Json<TaxReportResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let from = format!("{year:04}-01-01");
    let to = format!("{year:04}-12-31");

    let units = landlord_units(&state, user.id).await?;

    let mut reports = Vec::with_capacity(units.len());
    let mut total_tax = 0i64;

    for (unit_db_id, unit_public_id, unit_name, letting_kind) in units {
        let (income, expense): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_type = 'income' THEN amount_ore ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN entry_type = 'expense' THEN amount_ore ELSE 0 END), 0)
            FROM financial_entries
            WHERE unit_id = ? AND entry_date >= ? AND entry_date <= ?
            "#,
        )
        .bind(unit_db_id)
        .bind(&from)
        .bind(&to)
        .fetch_one(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to aggregate entries for tax report: {}", e);
            ApiError::internal_server_error("Failed to build tax report")
        })?;

        let estimate = tax::estimate(LettingKind::from(letting_kind.as_str()), income, expense);
        total_tax += estimate.estimated_tax_ore;
        reports.push(UnitTaxReport {
            unit_id: unit_public_id,
            unit_name,
            estimate,
        });
    }

    Ok(Json(TaxReportResponse {
        year,
        units: reports,
        total_estimated_tax_ore: total_tax,
    }))
}

async fn landlord_units(
    state: &AppState,
    user_id: i64,
) -> Result<Vec<(i64, String, String, String)>, ApiError> {
    let rows = sqlx::query(
        r#"
        SELECT u.id, u.public_id, u.name, u.letting_kind
        FROM rental_units u
        JOIN unit_landlords ul ON ul.unit_id = u.id
        WHERE ul.user_id = ?
        ORDER BY u.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch units: {}", e);
        ApiError::internal_server_error("Failed to build report")
    })?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.get::<i64, _>("id"),
                row.get::<String, _>("public_id"),
                row.get::<String, _>("name"),
                row.get::<String, _>("letting_kind"),
            )
        })
        .collect())
}
