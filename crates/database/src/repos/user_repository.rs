//! User repository for database operations.

use crate::entities::user::{User, UserRole};
use crate::types::{UserError, UserResult};
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, public_id, email, display_name, phone, role, status, created_at, updated_at FROM users WHERE id = ? AND status != 'deleted'"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    /// Find user by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> UserResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, public_id, email, display_name, phone, role, status, created_at, updated_at FROM users WHERE public_id = ? AND status != 'deleted'"
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, public_id, email, display_name, phone, role, status, created_at, updated_at FROM users WHERE email = ? AND status != 'deleted'"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    /// Update profile fields. Role and email are immutable here.
    pub async fn update_profile(
        &self,
        user_id: i64,
        display_name: Option<&str>,
        phone: Option<&str>,
    ) -> UserResult<User> {
        let now = Utc::now().to_rfc3339();

        let mut query_parts = Vec::new();
        let mut values = Vec::new();

        if let Some(display_name) = display_name {
            query_parts.push("display_name = ?");
            values.push(display_name.to_string());
        }

        if let Some(phone) = phone {
            query_parts.push("phone = ?");
            values.push(phone.to_string());
        }

        if query_parts.is_empty() {
            return self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound);
        }

        query_parts.push("updated_at = ?");
        values.push(now);

        let set_clause = query_parts.join(", ");
        let query_str = format!(
            "UPDATE users SET {} WHERE id = ? AND status != 'deleted'",
            set_clause
        );

        let mut query = sqlx::query(&query_str);
        for value in values {
            query = query.bind(value);
        }
        query = query.bind(user_id);

        query
            .execute(&self.pool)
            .await
            .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)
    }

    /// Lock in the account role. Succeeds only while the role is still
    /// `unassigned`; a second choice is rejected.
    pub async fn set_role(&self, user_id: i64, role: UserRole) -> UserResult<User> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND role = 'unassigned' AND status != 'deleted'"
        )
        .bind(role.to_string())
        .bind(&now)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            // Distinguish a missing user from a locked role.
            return match self.find_by_id(user_id).await? {
                Some(_) => Err(UserError::RoleAlreadyChosen),
                None => Err(UserError::UserNotFound),
            };
        }

        self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)
    }

    /// Delete user (soft delete)
    pub async fn delete(&self, id: i64) -> UserResult<()> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE users SET status = 'deleted', updated_at = ? WHERE id = ? AND status != 'deleted'",
        )
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        Ok(())
    }

    /// Users still waiting for a role choice
    pub async fn find_unassigned(&self, limit: u32) -> UserResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, public_id, email, display_name, phone, role, status, created_at, updated_at
            FROM users
            WHERE role = 'unassigned' AND status != 'deleted'
            ORDER BY created_at ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| UserError::DatabaseError(e.to_string()))
    }

    /// Get user count
    pub async fn count(&self) -> UserResult<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status != 'deleted'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| UserError::DatabaseError(e.to_string()))?;

        Ok(count.unwrap_or(0))
    }
}
