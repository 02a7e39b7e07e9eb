//! Rental unit entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A rental property listing owned by a landlord.
///
/// Shared-housing sub-units live in the embedded `rooms` list; a unit with
/// rooms rents each room out individually while the unit-level rent covers
/// whole-unit lets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentalUnit {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub landlord_id: i64,
    pub tenant_id: Option<i64>,
    pub name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub status: UnitStatus,
    pub monthly_rent_ore: i64,
    pub deposit_ore: i64,
    pub size_sqm: Option<i64>,
    pub bedrooms: Option<i64>,
    pub furnished: bool,
    pub letting_kind: LettingKind,
    pub description: Option<String>,
    pub rooms: Vec<Room>,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for RentalUnit {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let rooms_json: String = row.try_get("rooms")?;
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            landlord_id: row.try_get("landlord_id")?,
            tenant_id: row.try_get("tenant_id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            postal_code: row.try_get("postal_code")?,
            city: row.try_get("city")?,
            status: UnitStatus::from(row.try_get::<String, _>("status")?.as_str()),
            monthly_rent_ore: row.try_get("monthly_rent_ore")?,
            deposit_ore: row.try_get("deposit_ore")?,
            size_sqm: row.try_get("size_sqm")?,
            bedrooms: row.try_get("bedrooms")?,
            furnished: row.try_get("furnished")?,
            letting_kind: LettingKind::from(row.try_get::<String, _>("letting_kind")?.as_str()),
            description: row.try_get("description")?,
            rooms: serde_json::from_str(&rooms_json).unwrap_or_default(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Shared-housing room embedded in a [`RentalUnit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub monthly_rent_ore: i64,
    #[serde(default)]
    pub tenant_id: Option<i64>,
}

/// Unit status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Vacant,
    Occupied,
    PendingInvitation,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Vacant => "vacant",
            UnitStatus::Occupied => "occupied",
            UnitStatus::PendingInvitation => "pending_invitation",
        }
    }
}

impl From<&str> for UnitStatus {
    fn from(s: &str) -> Self {
        match s {
            "occupied" => UnitStatus::Occupied,
            "pending_invitation" => UnitStatus::PendingInvitation,
            _ => UnitStatus::Vacant,
        }
    }
}

impl ToString for UnitStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// Row in the unit/landlord membership table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitLandlord {
    pub id: i64,
    pub unit_id: i64,
    pub user_id: i64,
    pub role: LandlordRole,
    pub ownership_percent: i64,
    pub joined_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for UnitLandlord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            unit_id: row.try_get("unit_id")?,
            user_id: row.try_get("user_id")?,
            role: LandlordRole::from(row.try_get::<String, _>("role")?.as_str()),
            ownership_percent: row.try_get("ownership_percent")?,
            joined_at: row.try_get("joined_at")?,
        })
    }
}

/// How the unit is let, which decides its tax treatment.
///
/// `own_home` is letting part of the home the landlord lives in,
/// `short_term_own_home` is Airbnb-style letting of the own home, and
/// `secondary` is an investment unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LettingKind {
    OwnHome,
    ShortTermOwnHome,
    Secondary,
}

impl LettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LettingKind::OwnHome => "own_home",
            LettingKind::ShortTermOwnHome => "short_term_own_home",
            LettingKind::Secondary => "secondary",
        }
    }
}

impl From<&str> for LettingKind {
    fn from(s: &str) -> Self {
        match s {
            "own_home" => LettingKind::OwnHome,
            "short_term_own_home" => LettingKind::ShortTermOwnHome,
            _ => LettingKind::Secondary,
        }
    }
}

impl ToString for LettingKind {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// Landlord role within a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandlordRole {
    Owner,
    CoLandlord,
}

impl LandlordRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LandlordRole::Owner => "owner",
            LandlordRole::CoLandlord => "co_landlord",
        }
    }
}

impl From<&str> for LandlordRole {
    fn from(s: &str) -> Self {
        match s {
            "co_landlord" => LandlordRole::CoLandlord,
            _ => LandlordRole::Owner,
        }
    }
}

impl ToString for LandlordRole {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
