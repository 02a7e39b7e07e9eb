use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;
use utleie_auth::Authenticator;
use utleie_config::AppConfig;
use utleie_database::initialize_database;
use utleie_mailer::Mailer;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub mailer: Mailer,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone());
        let mailer = Mailer::from_config(&config.email);

        info!(email_enabled = mailer.enabled(), "backend services ready");

        Ok(Self {
            db_pool,
            authenticator,
            mailer,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn services_initialise_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.database.url = format!(
            "sqlite://{}",
            temp_dir.path().join("runtime.db").display()
        );

        let services = BackendServices::initialise(&config).await.unwrap();
        assert!(!services.mailer.enabled());

        sqlx::query("SELECT 1")
            .fetch_one(&services.db_pool)
            .await
            .unwrap();
    }
}
