//! Shared visibility checks for rental units.
//!
//! A unit is visible to its landlords (the `unit_landlords` membership)
//! and to its current tenant. Everyone else gets a 404 so unit public
//! ids leak nothing.

use sqlx::{Row, SqlitePool};
use tracing::error;
use utleie_database::LandlordRole;

use crate::ApiError;

/// The caller's relationship to a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitAccess {
    Landlord(LandlordRole),
    Tenant,
}

impl UnitAccess {
    pub fn is_landlord(&self) -> bool {
        matches!(self, UnitAccess::Landlord(_))
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, UnitAccess::Landlord(LandlordRole::Owner))
    }
}

/// Resolve a unit public id to its database id and the caller's access.
pub async fn find_unit_access(
    pool: &SqlitePool,
    unit_public_id: &str,
    user_id: i64,
) -> Result<Option<(i64, UnitAccess)>, ApiError> {
    let row = sqlx::query(
        r#"
        SELECT u.id, u.tenant_id, ul.role AS landlord_role
        FROM rental_units u
        LEFT JOIN unit_landlords ul ON ul.unit_id = u.id AND ul.user_id = ?
        WHERE u.public_id = ?
        "#,
    )
    .bind(user_id)
    .bind(unit_public_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!("Failed to resolve unit access: {}", e);
        ApiError::internal_server_error("Failed to resolve unit")
    })?;

    let Some(row) = row else {
        return Ok(None);
    };

    let unit_id: i64 = row
        .try_get("id")
        .map_err(|_| ApiError::internal_server_error("Failed to resolve unit"))?;
    let landlord_role: Option<String> = row.try_get("landlord_role").unwrap_or(None);
    let tenant_id: Option<i64> = row.try_get("tenant_id").unwrap_or(None);

    if let Some(role) = landlord_role {
        return Ok(Some((unit_id, UnitAccess::Landlord(LandlordRole::from(role.as_str())))));
    }

    if tenant_id == Some(user_id) {
        return Ok(Some((unit_id, UnitAccess::Tenant)));
    }

    Ok(None)
}

/// Require any access to a unit, mapping "no access" to 404.
pub async fn require_unit_access(
    pool: &SqlitePool,
    unit_public_id: &str,
    user_id: i64,
) -> Result<(i64, UnitAccess), ApiError> {
    find_unit_access(pool, unit_public_id, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Unit not found"))
}

/// Require landlord access to a unit. Tenants of the unit get a 403,
/// strangers a 404.
pub async fn require_unit_landlord(
    pool: &SqlitePool,
    unit_public_id: &str,
    user_id: i64,
) -> Result<(i64, LandlordRole), ApiError> {
    match require_unit_access(pool, unit_public_id, user_id).await? {
        (unit_id, UnitAccess::Landlord(role)) => Ok((unit_id, role)),
        (_, UnitAccess::Tenant) => Err(ApiError::forbidden("Only landlords can do this")),
    }
}
