//! Financial entry entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// One income or expense booking against a rental unit.
///
/// Amounts are integer øre. Entries spawned by completed maintenance
/// tasks carry the task id so reverting the task can remove them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialEntry {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub unit_id: i64,
    pub recorded_by: i64,
    pub entry_type: EntryType,
    pub category: String,
    pub amount_ore: i64,
    pub entry_date: String,
    pub description: Option<String>,
    pub maintenance_task_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for FinancialEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            unit_id: row.try_get("unit_id")?,
            recorded_by: row.try_get("recorded_by")?,
            entry_type: EntryType::from(row.try_get::<String, _>("entry_type")?.as_str()),
            category: row.try_get("category")?,
            amount_ore: row.try_get("amount_ore")?,
            entry_date: row.try_get("entry_date")?,
            description: row.try_get("description")?,
            maintenance_task_id: row.try_get("maintenance_task_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Entry type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Income => "income",
            EntryType::Expense => "expense",
        }
    }
}

impl From<&str> for EntryType {
    fn from(s: &str) -> Self {
        match s {
            "expense" => EntryType::Expense,
            _ => EntryType::Income,
        }
    }
}

impl ToString for EntryType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// Known booking categories per entry type. Unknown categories are kept
/// verbatim so imports do not lose data.
pub const INCOME_CATEGORIES: &[&str] = &["rent", "deposit", "other"];
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "maintenance",
    "insurance",
    "municipal_fees",
    "utilities",
    "mortgage_interest",
    "other",
];
