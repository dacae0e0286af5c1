use std::sync::Arc;

use canvass_agent::{
    ActivityEmitter, AgentContext, AgentRegistry, AgentRuntime, CrmSync, RunLedger,
    SentimentRecorder,
};
use canvass_core::config::{AppConfig, ConfigError, LoadOptions};
use canvass_db::connection::connect_with_config;
use canvass_db::repositories::{
    AgentRunRepository, ProfileRepository, SqlActivityRepository, SqlAgentRunRepository,
    SqlContactRepository, SqlIntegrationRepository, SqlProfileRepository, SqlSentimentRepository,
};
use canvass_db::{migrations, DbPool};
use canvass_providers::{ProviderError, ProviderRegistry};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration issue: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect to database: {0}")]
    Database(String),
    #[error("failed to apply migrations: {0}")]
    Migration(String),
    #[error("failed to build providers: {0}")]
    Providers(#[from] ProviderError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Database(_) => "db_connectivity",
            Self::Migration(_) => "migration",
            Self::Providers(_) => "provider_setup",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Database(_) => 4,
            Self::Migration(_) => 5,
            Self::Providers(_) => 6,
        }
    }
}

/// The wired process: one pool, one provider registry, one agent runtime.
pub struct Application {
    pub config: AppConfig,
    pub pool: DbPool,
    pub profiles: Arc<dyn ProfileRepository>,
    pub runs: Arc<dyn AgentRunRepository>,
    pub runtime: AgentRuntime,
}

impl Application {
    pub async fn close(self) {
        self.pool.close().await;
    }
}

pub fn load_config() -> Result<AppConfig, BootstrapError> {
    Ok(AppConfig::load(LoadOptions::default())?)
}

pub async fn bootstrap(config: AppConfig) -> Result<Application, BootstrapError> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| BootstrapError::Database(error.to_string()))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| BootstrapError::Migration(error.to_string()))?;

    let providers = ProviderRegistry::from_config(&config)?;
    let runs: Arc<dyn AgentRunRepository> = Arc::new(SqlAgentRunRepository::new(pool.clone()));
    let context = AgentContext {
        crm: CrmSync::new(
            providers.crm(),
            Arc::new(SqlIntegrationRepository::new(pool.clone())),
        ),
        providers,
        contacts: Arc::new(SqlContactRepository::new(pool.clone())),
        ledger: RunLedger::new(runs.clone()),
        activity: ActivityEmitter::new(Arc::new(SqlActivityRepository::new(pool.clone()))),
        sentiment: SentimentRecorder::new(Arc::new(SqlSentimentRepository::new(pool.clone()))),
        default_max_leads: config.pipeline.default_max_leads,
    };

    info!(
        event_name = "cli.bootstrap.ready",
        llm_provider = config.llm.provider.as_str(),
        discovery_provider = config.discovery.provider.as_str(),
        crm_enabled = config.crm.enabled,
        "application wired"
    );

    Ok(Application {
        profiles: Arc::new(SqlProfileRepository::new(pool.clone())),
        runs,
        runtime: AgentRuntime::new(AgentRegistry::new(context)),
        pool,
        config,
    })
}
