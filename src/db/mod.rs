//! Database module - AppState and database operations
//!
//! - `template` - PostgreSQL `TemplateStore`

mod template;

pub use template::PgTemplateStore;

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::report::ReportService;
use crate::storage::ObjectStorage;
use crate::template::{TemplateRepository, TemplateStore, TemplateValidator};

#[derive(Clone)]
pub struct AppState {
    pub templates: Arc<TemplateRepository>,
    pub reports: Arc<ReportService>,
}

impl AppState {
    /// Connect, run migrations and select the storage backend.
    pub async fn new(config: &AppConfig) -> Result<Self, anyhow::Error> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(900))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("Database migrations applied");

        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .user_agent("tahfidz-docs-server/0.3")
            .build()?;

        let storage = crate::storage::from_config(config, http_client)?;
        let store: Arc<dyn TemplateStore> = Arc::new(PgTemplateStore::new(pool));

        Ok(Self::with_components(store, storage, config.school.clone()))
    }

    /// Wire the services over an arbitrary store and storage backend.
    pub fn with_components(
        store: Arc<dyn TemplateStore>,
        storage: Arc<dyn ObjectStorage>,
        school: crate::config::SchoolProfile,
    ) -> Self {
        let validator = Arc::new(TemplateValidator::new());
        let templates = Arc::new(TemplateRepository::new(store, storage.clone(), validator));
        let reports = Arc::new(ReportService::new(templates.clone(), storage, school));

        Self {
            templates,
            reports,
        }
    }
}
