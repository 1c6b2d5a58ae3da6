//! Application state.

use std::sync::Arc;

use tracing::info;

use jobradar_manager::{HealthSupervisor, ParserManager};
use jobradar_sources::{HhSource, SourceAdapter, SuperJobSource};

use crate::config::{self, ApiConfig, CachesYaml, HealthCheckYaml, ManagerYaml, SourcesYaml};
use crate::service::SearchService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: SearchService,
}

impl AppState {
    /// Build every component: sources from config, the health
    /// supervisor (waiting out its first probe pass), the manager and
    /// the façade.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let caches: CachesYaml = config::load_yaml_config("CACHES_CONFIG_PATH")?;
        let sources_yaml: SourcesYaml = config::load_yaml_config("SOURCES_CONFIG_PATH")?;
        let manager_yaml: ManagerYaml = config::load_yaml_config("MANAGER_CONFIG_PATH")?;
        let health_yaml: HealthCheckYaml = config::load_yaml_config("HEALTH_CHECK_CONFIG_PATH")?;

        let mut sources: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        if sources_yaml.hh.enabled {
            let cfg = sources_yaml.hh.apply_to(HhSource::default_config());
            sources.push(Arc::new(HhSource::new(cfg)?));
        }
        if sources_yaml.superjob.enabled {
            let cfg = sources_yaml.superjob.apply_to(SuperJobSource::default_config());
            sources.push(Arc::new(SuperJobSource::new(cfg)?));
        }
        if sources.is_empty() {
            return Err("no sources enabled".into());
        }
        info!(
            sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "sources configured"
        );

        let endpoints: Vec<(String, String)> = sources
            .iter()
            .map(|s| (s.name().to_string(), s.health_endpoint().to_string()))
            .collect();
        let supervisor = Arc::new(HealthSupervisor::start(health_yaml.into(), &endpoints));
        supervisor.wait_ready().await;

        let manager_config = config::manager_config(&config, &caches, &manager_yaml);
        let manager = ParserManager::new(manager_config, supervisor, sources)?;

        Ok(Self {
            config,
            service: SearchService::new(manager),
        })
    }

    /// State over an already-built manager; used by tests.
    pub fn with_manager(config: ApiConfig, manager: Arc<ParserManager>) -> Self {
        Self {
            config,
            service: SearchService::new(manager),
        }
    }
}
