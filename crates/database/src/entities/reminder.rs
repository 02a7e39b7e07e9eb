//! Payment reminder entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReminder {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub unit_id: i64,
    pub tenant_id: i64,
    pub amount_ore: i64,
    pub due_date: String,
    pub status: ReminderStatus,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for PaymentReminder {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            unit_id: row.try_get("unit_id")?,
            tenant_id: row.try_get("tenant_id")?,
            amount_ore: row.try_get("amount_ore")?,
            due_date: row.try_get("due_date")?,
            status: ReminderStatus::from(row.try_get::<String, _>("status")?.as_str()),
            sent_at: row.try_get("sent_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Reminder status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Paid,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Paid => "paid",
        }
    }
}

impl From<&str> for ReminderStatus {
    fn from(s: &str) -> Self {
        match s {
            "sent" => ReminderStatus::Sent,
            "paid" => ReminderStatus::Paid,
            _ => ReminderStatus::Pending,
        }
    }
}

impl ToString for ReminderStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
