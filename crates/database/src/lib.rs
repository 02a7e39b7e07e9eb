//! Enkel Utleie database crate
//!
//! Provides database functionality for the Enkel Utleie backend, including
//! connection management, migrations, entity definitions, and repository
//! implementations.

use sqlx::SqlitePool;
use utleie_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{NotificationRepository, UserRepository};

// Re-export entities
pub use entities::{
    agreement::{AgreementStatus, RentalAgreement, SignerParty, TransitionError},
    error_log::ErrorLog,
    event::{CalendarEvent, EventType},
    finance::{EntryType, FinancialEntry},
    invitation::{CoLandlordInvitation, InvitationStatus, TenantInvitation},
    maintenance::{MaintenanceTask, TaskPriority, TaskStatus},
    message::ChatMessage,
    notification::{Notification, NotificationType},
    rating::TenantRating,
    reminder::{PaymentReminder, ReminderStatus},
    unit::{LandlordRole, LettingKind, RentalUnit, Room, UnitLandlord, UnitStatus},
    user::{User, UserRole, UserStatus},
};

// Re-export types
pub use types::{
    errors::{DatabaseError, NotificationError, UserError},
    DatabaseResult, NotificationResult, UserResult,
};

/// Re-export commonly used types for convenience
pub use sqlx::Pool;

/// Generate a new public identifier for an externally visible record.
pub fn new_public_id() -> String {
    cuid2::cuid()
}

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let config = DatabaseConfig {
            url: db_url,
            max_connections: 1,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (_pool, _temp_dir) = create_test_database().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_database().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result.0, true);
    }

    #[tokio::test]
    async fn test_schema_has_domain_tables() {
        let (pool, _temp_dir) = create_test_database().await;

        for table in [
            "users",
            "rental_units",
            "rental_agreements",
            "financial_entries",
            "maintenance_tasks",
            "chat_messages",
            "notifications",
            "calendar_events",
            "tenant_invitations",
            "co_landlord_invitations",
            "payment_reminders",
            "tenant_ratings",
            "error_logs",
        ] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }
}
