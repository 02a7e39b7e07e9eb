//! Error log entity definitions

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Best-effort client crash report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub message: String,
    pub context: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for ErrorLog {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            message: row.try_get("message")?,
            context: row.try_get("context")?,
            user_agent: row.try_get("user_agent")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
