use axum::Router;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::info;

use shelfbot_agent::{AgentRuntime, CatalogRepositories};
use shelfbot_core::config::{AppConfig, ConfigError, LlmProvider, LoadOptions};
use shelfbot_db::{connect_from_config, migrations, DbPool};

use crate::{catalog, chat, health};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: AgentRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", correlation_id = "bootstrap", "starting application bootstrap");

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let runtime = AgentRuntime::from_config(CatalogRepositories::sql(db_pool.clone()), &config.llm);
    info!(
        event_name = "system.bootstrap.llm_selected",
        correlation_id = "bootstrap",
        generative = config.llm.provider == LlmProvider::Gemini,
        model = %config.llm.model,
        "generative backend selected"
    );

    Ok(Application { config, db_pool, runtime })
}

impl Application {
    /// Every HTTP surface merged behind a permissive CORS layer.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(self.db_pool.clone()))
            .merge(chat::router(self.runtime.clone()))
            .merge(catalog::router(self.runtime.catalog().clone()))
            .layer(CorsLayer::permissive())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use shelfbot_core::config::{ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_gemini_has_no_key() {
        let mut options = overrides("sqlite::memory:");
        options.overrides.llm_provider = Some(LlmProvider::Gemini);

        let result = bootstrap(options).await;
        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.api_key"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_serves_every_surface() {
        let app = bootstrap(overrides("sqlite::memory:")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN \
             ('product', 'product_variant', 'product_category', 'inventory_item', \
              'inventory_level', 'price_list', 'price')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("catalog tables");
        assert_eq!(table_count, 7);

        let router = app.router();
        for uri in ["/health", "/api/products", "/api/categories", "/api/chatbot/help"] {
            let request = Request::get(uri).body(Body::empty()).expect("request");
            let response = router.clone().oneshot(request).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            to_bytes(response.into_body(), usize::MAX).await.expect("body");
        }

        app.db_pool.close().await;
    }
}
