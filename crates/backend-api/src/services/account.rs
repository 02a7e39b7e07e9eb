//! Cascading account deletion.
//!
//! Removes every record a user owns or participates in, in an order that
//! never leaves dangling foreign keys. Each step is best-effort: a failed
//! delete is logged and skipped so the bulk operation always runs to the
//! end, and the report tells the caller what actually went.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;
use utleie_database::User;

/// Per-table counts of deleted rows
#[derive(Debug, Default, Serialize)]
pub struct CascadeReport {
    pub deleted: BTreeMap<&'static str, u64>,
    pub skipped: Vec<&'static str>,
}

impl CascadeReport {
    fn record(&mut self, table: &'static str, result: Result<u64, sqlx::Error>) {
        match result {
            Ok(count) => {
                self.deleted.insert(table, count);
            }
            Err(error) => {
                warn!(table, %error, "cascade delete step failed, skipping");
                self.skipped.push(table);
            }
        }
    }
}

async fn run_delete(
    pool: &SqlitePool,
    sql: &str,
    user_id: i64,
    bind_twice: bool,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(sql).bind(user_id);
    if bind_twice {
        query = query.bind(user_id);
    }
    Ok(query.execute(pool).await?.rows_affected())
}

/// Delete everything belonging to a user except the user row itself.
///
/// Units owned by the user are deleted outright; their dependent records
/// go with them through `ON DELETE CASCADE`. Units where the user is
/// merely tenant are vacated instead.
pub async fn delete_user_data(pool: &SqlitePool, user: &User) -> CascadeReport {
    let mut report = CascadeReport::default();

    // Vacate tenancies before anything else so the units survive.
    let vacated = sqlx::query(
        "UPDATE rental_units SET tenant_id = NULL, status = 'vacant' WHERE tenant_id = ?",
    )
    .bind(user.id)
    .execute(pool)
    .await
    .map(|r| r.rows_affected());
    report.record("vacated_units", vacated);

    report.record(
        "tenant_ratings",
        run_delete(
            pool,
            "DELETE FROM tenant_ratings WHERE tenant_id = ? OR landlord_id = ?",
            user.id,
            true,
        )
        .await,
    );
    report.record(
        "payment_reminders",
        run_delete(
            pool,
            "DELETE FROM payment_reminders WHERE tenant_id = ?",
            user.id,
            false,
        )
        .await,
    );
    report.record(
        "error_logs",
        run_delete(pool, "DELETE FROM error_logs WHERE user_id = ?", user.id, false).await,
    );
    report.record(
        "calendar_events",
        run_delete(
            pool,
            "DELETE FROM calendar_events WHERE user_id = ?",
            user.id,
            false,
        )
        .await,
    );
    report.record(
        "chat_messages",
        run_delete(
            pool,
            "DELETE FROM chat_messages WHERE sender_id = ? OR recipient_id = ?",
            user.id,
            true,
        )
        .await,
    );
    report.record(
        "notifications",
        run_delete(
            pool,
            "DELETE FROM notifications WHERE user_id = ?",
            user.id,
            false,
        )
        .await,
    );

    // Invitations the user sent, plus invitations addressed to their email.
    let email = user.email.clone().unwrap_or_default();
    let tenant_invitations = sqlx::query(
        "DELETE FROM tenant_invitations WHERE inviter_id = ? OR email = ?",
    )
    .bind(user.id)
    .bind(&email)
    .execute(pool)
    .await
    .map(|r| r.rows_affected());
    report.record("tenant_invitations", tenant_invitations);

    let co_landlord_invitations = sqlx::query(
        "DELETE FROM co_landlord_invitations WHERE inviter_id = ? OR email = ?",
    )
    .bind(user.id)
    .bind(&email)
    .execute(pool)
    .await
    .map(|r| r.rows_affected());
    report.record("co_landlord_invitations", co_landlord_invitations);

    report.record(
        "rental_agreements",
        run_delete(
            pool,
            "DELETE FROM rental_agreements WHERE landlord_id = ? OR tenant_id = ?",
            user.id,
            true,
        )
        .await,
    );
    report.record(
        "financial_entries",
        run_delete(
            pool,
            "DELETE FROM financial_entries WHERE recorded_by = ?",
            user.id,
            false,
        )
        .await,
    );
    report.record(
        "maintenance_tasks",
        run_delete(
            pool,
            "DELETE FROM maintenance_tasks WHERE reported_by = ?",
            user.id,
            false,
        )
        .await,
    );
    report.record(
        "unit_landlords",
        run_delete(
            pool,
            "DELETE FROM unit_landlords WHERE user_id = ?",
            user.id,
            false,
        )
        .await,
    );

    // Owned units last among domain records; cascades sweep anything
    // that still points at them.
    report.record(
        "rental_units",
        run_delete(
            pool,
            "DELETE FROM rental_units WHERE landlord_id = ?",
            user.id,
            false,
        )
        .await,
    );

    report.record(
        "sessions",
        run_delete(pool, "DELETE FROM sessions WHERE user_id = ?", user.id, false).await,
    );
    report.record(
        "user_identities",
        run_delete(
            pool,
            "DELETE FROM user_identities WHERE user_id = ?",
            user.id,
            false,
        )
        .await,
    );

    report
}

/// Hard-delete the user row. Used by the admin purge; self-service
/// deletion soft-deletes instead so the row id stays reserved.
pub async fn delete_user_row(pool: &SqlitePool, user_id: i64) -> Result<u64, sqlx::Error> {
    Ok(sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected())
}
