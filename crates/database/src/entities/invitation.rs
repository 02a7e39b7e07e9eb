//! Invitation entity definitions.
//!
//! Tenant and co-landlord invitations share the same token mechanics:
//! a unique single-use token, a seven-day expiry window, and a status
//! that flips to `expired` lazily when a stale row is touched.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantInvitation {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub unit_id: i64,
    pub inviter_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub status: InvitationStatus,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for TenantInvitation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            unit_id: row.try_get("unit_id")?,
            inviter_id: row.try_get("inviter_id")?,
            email: row.try_get("email")?,
            token: row.try_get("token")?,
            status: InvitationStatus::from(row.try_get::<String, _>("status")?.as_str()),
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoLandlordInvitation {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub unit_id: i64,
    pub inviter_id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub ownership_percent: i64,
    pub status: InvitationStatus,
    pub expires_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for CoLandlordInvitation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            unit_id: row.try_get("unit_id")?,
            inviter_id: row.try_get("inviter_id")?,
            email: row.try_get("email")?,
            token: row.try_get("token")?,
            ownership_percent: row.try_get("ownership_percent")?,
            status: InvitationStatus::from(row.try_get::<String, _>("status")?.as_str()),
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Invitation status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Cancelled => "cancelled",
        }
    }
}

impl From<&str> for InvitationStatus {
    fn from(s: &str) -> Self {
        match s {
            "accepted" => InvitationStatus::Accepted,
            "declined" => InvitationStatus::Declined,
            "expired" => InvitationStatus::Expired,
            "cancelled" => InvitationStatus::Cancelled,
            _ => InvitationStatus::Pending,
        }
    }
}

impl ToString for InvitationStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
