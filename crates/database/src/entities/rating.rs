//! Tenant rating entity definitions

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A landlord's rating of a tenant, one per landlord/tenant/unit triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantRating {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub tenant_id: i64,
    pub landlord_id: i64,
    pub unit_id: i64,
    pub score: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for TenantRating {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            tenant_id: row.try_get("tenant_id")?,
            landlord_id: row.try_get("landlord_id")?,
            unit_id: row.try_get("unit_id")?,
            score: row.try_get("score")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
