//! Chat message entity definitions

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// One message in a unit's landlord/tenant thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub unit_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for ChatMessage {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            unit_id: row.try_get("unit_id")?,
            sender_id: row.try_get("sender_id")?,
            recipient_id: row.try_get("recipient_id")?,
            content: row.try_get("content")?,
            read: row.try_get("read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
