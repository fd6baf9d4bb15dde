use std::sync::Arc;

use tracing::{error, info, warn};

use crate::concierge::{Bridge, Concierge};
use crate::config::{AppConfig, RuntimeEnv};
use crate::db::{get_connection, DuckDbStore, NoopStore, VisitorStore};
use crate::llm::ProviderFactory;

/// Which optional backends this process runs with, decided once at startup.
pub struct Capabilities {
    pub store: Arc<dyn VisitorStore>,
    pub bridge: Bridge,
}

impl Capabilities {
    pub fn resolve(config: &AppConfig) -> Self {
        let bridge = match ProviderFactory::create(&config.llm) {
            Some(provider) => Bridge::Live(provider),
            None => Bridge::Unconfigured(config.llm.provider),
        };

        Self {
            store: open_store(config),
            bridge,
        }
    }
}

fn open_store(config: &AppConfig) -> Arc<dyn VisitorStore> {
    let Some(database) = &config.database else {
        return Arc::new(NoopStore);
    };

    if database.is_in_memory() && config.environment == RuntimeEnv::Production {
        warn!("In-memory database refused in production, persistence disabled");
        return Arc::new(NoopStore);
    }

    match get_connection(database) {
        Ok(pool) => Arc::new(DuckDbStore::new(pool)),
        Err(e) => {
            error!("Failed to initialize database, persistence disabled: {}", e);
            Arc::new(NoopStore)
        }
    }
}

/// Everything a request handler needs.
pub struct AppState {
    pub config: AppConfig,
    pub concierge: Concierge,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let capabilities = Capabilities::resolve(&config);
        Self::with_capabilities(config, capabilities)
    }

    pub fn with_capabilities(config: AppConfig, capabilities: Capabilities) -> Arc<Self> {
        let concierge = Concierge::new(capabilities.store, capabilities.bridge, &config.chat);
        Arc::new(Self { config, concierge })
    }

    /// The environment check printed at startup. Never logs secret values.
    pub fn log_environment(&self) {
        let configured = |on: bool| if on { "configured" } else { "not configured" };

        info!("Environment check:");
        info!("- PORT: {}", self.config.server.port);
        info!("- NODE_ENV: {}", self.config.environment.as_str());
        info!("- DATABASE_URL: {}", self.database_status());
        info!(
            "- {}: {}",
            self.config.llm.provider.env_key(),
            configured(matches!(self.concierge.bridge(), Bridge::Live(_)))
        );
        info!("- ERROR_POLICY: {:?}", self.config.chat.error_policy);
    }

    fn database_status(&self) -> &'static str {
        match (
            self.config.database_url_set,
            self.concierge.store().is_persistent(),
        ) {
            (_, true) => "configured",
            (true, false) => "configured (persistence disabled)",
            (false, false) => "not configured",
        }
    }
}
