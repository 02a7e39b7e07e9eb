//! Calendar event entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub user_id: i64,
    pub unit_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub starts_at: String,
    pub ends_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for CalendarEvent {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            user_id: row.try_get("user_id")?,
            unit_id: row.try_get("unit_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            event_type: EventType::from(row.try_get::<String, _>("event_type")?.as_str()),
            starts_at: row.try_get("starts_at")?,
            ends_at: row.try_get("ends_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Event type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Viewing,
    MoveIn,
    MoveOut,
    Inspection,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Viewing => "viewing",
            EventType::MoveIn => "move_in",
            EventType::MoveOut => "move_out",
            EventType::Inspection => "inspection",
            EventType::Other => "other",
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "viewing" => EventType::Viewing,
            "move_in" => EventType::MoveIn,
            "move_out" => EventType::MoveOut,
            "inspection" => EventType::Inspection,
            _ => EventType::Other,
        }
    }
}

impl ToString for EventType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
