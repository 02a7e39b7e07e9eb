use chrono::Duration;
use sqlx::SqlitePool;
use utleie_auth::{AuthSession, Authenticator};
use utleie_config::AppConfig;
use utleie_database::{NotificationRepository, User, UserRepository};
use utleie_mailer::Mailer;

use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    mailer: Mailer,
    users: UserRepository,
    notifications: NotificationRepository,
    invitation_ttl: Duration,
}

impl AppState {
    pub fn new(pool: SqlitePool, authenticator: Authenticator, mailer: Mailer, config: &AppConfig) -> Self {
        let users = UserRepository::new(pool.clone());
        let notifications = NotificationRepository::new(pool.clone());
        let invitation_ttl = Duration::days(i64::from(config.auth.invitation_ttl_days));

        Self {
            pool,
            authenticator,
            mailer,
            users,
            notifications,
            invitation_ttl,
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn notifications(&self) -> &NotificationRepository {
        &self.notifications
    }

    pub fn invitation_ttl(&self) -> Duration {
        self.invitation_ttl
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }
}
