use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::{
    routes::models::{CreateRatingRequest, RatingResponse, RatingsResponse},
    services::access::require_unit_landlord,
    util::require_bearer,
    ApiError, AppState,
};
use utleie_database::{new_public_id, TenantRating, UserRole};

pub async fn create_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRatingRequest>,
) -> Result<Json<RatingResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (unit_db_id, _) = require_unit_landlord(state.db_pool(), &req.unit_id, user.id).await?;

    if !(1..=5).contains(&req.score) {
        return Err(ApiError::bad_request("Score must be between 1 and 5"));
    }

    let tenant = state
        .users()
        .find_by_public_id(&req.tenant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    // Only tenants with a history on the unit can be rated.
    let has_history: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM rental_units WHERE id = ? AND tenant_id = ?
        UNION
        SELECT 1 FROM rental_agreements WHERE unit_id = ? AND tenant_id = ?
        "#,
    )
    .bind(unit_db_id)
    .bind(tenant.id)
    .bind(unit_db_id)
    .bind(tenant.id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check tenancy history: {}", e);
        ApiError::internal_server_error("Failed to create rating")
    })?;

    if has_history.is_none() {
        return Err(ApiError::bad_request(
            "The tenant has no tenancy history on this unit",
        ));
    }

    let public_id = new_public_id();
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO tenant_ratings (public_id, tenant_id, landlord_id, unit_id, score, comment, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(tenant.id)
    .bind(user.id)
    .bind(unit_db_id)
    .bind(req.score)
    .bind(&req.comment)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("You have already rated this tenant for this unit")
        } else {
            tracing::error!("Failed to create rating: {}", e);
            ApiError::internal_server_error("Failed to create rating")
        }
    })?;

    let rating =
        sqlx::query_as::<_, TenantRating>("SELECT * FROM tenant_ratings WHERE public_id = ?")
            .bind(&public_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch created rating: {}", e);
                ApiError::internal_server_error("Failed to create rating")
            })?;

    Ok(Json(RatingResponse { rating }))
}

/// Ratings for a tenant, visible to landlords vetting applicants.
pub async fn list_tenant_ratings(
    State(state): State<AppState>,
    Path(tenant_public_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RatingsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if user.role != UserRole::Landlord && user.role != UserRole::Admin {
        return Err(ApiError::forbidden("Only landlords can view tenant ratings"));
    }

    let tenant = state
        .users()
        .find_by_public_id(&tenant_public_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

    let ratings = sqlx::query_as::<_, TenantRating>(
        "SELECT * FROM tenant_ratings WHERE tenant_id = ? ORDER BY created_at DESC",
    )
    .bind(tenant.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch ratings: {}", e);
        ApiError::internal_server_error("Failed to fetch ratings")
    })?;

    let average_score = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().map(|r| r.score as f64).sum::<f64>() / ratings.len() as f64)
    };

    Ok(Json(RatingsResponse {
        ratings,
        average_score,
    }))
}
