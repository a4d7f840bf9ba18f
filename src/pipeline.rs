//! Config-driven assembly of the generation pipeline.

use crate::config::QuireConfig;
use crate::error::GenerationError;
use crate::generator::SectionContentGenerator;
use crate::orchestrator::{NoopObserver, Orchestrator, ProgressObserver, ResultMap};
use crate::provider::ModelClient;
use crate::registry::{InMemoryRegistry, SectionRegistry};
use crate::types::GenerationRequest;
use std::sync::Arc;
use tracing::info;

/// Registry, model client, generator, and orchestrator wired from one config.
pub struct Pipeline {
    registry: Arc<dyn SectionRegistry>,
    client: Arc<ModelClient>,
    orchestrator: Orchestrator,
}

impl Pipeline {
    /// Build from config, loading the registry from `generation.registry_path` when set.
    pub fn from_config(config: &QuireConfig) -> Result<Self, GenerationError> {
        let registry: Arc<dyn SectionRegistry> = match &config.generation.registry_path {
            Some(path) => {
                let registry = InMemoryRegistry::load_from_file(path)?;
                info!(
                    path = %path.display(),
                    sections = ?registry.section_types(),
                    "Section registry loaded"
                );
                Arc::new(registry)
            }
            None => Arc::new(InMemoryRegistry::new()),
        };
        Self::with_registry(config, registry, Arc::new(NoopObserver))
    }

    /// Build from config around an existing registry and observer.
    pub fn with_registry(
        config: &QuireConfig,
        registry: Arc<dyn SectionRegistry>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<Self, GenerationError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GenerationError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let client = Arc::new(ModelClient::from_settings(&config.provider)?);
        let generator = Arc::new(SectionContentGenerator::new(registry.clone(), client.clone()));
        let orchestrator = Orchestrator::new(generator, config.generation.concurrency_limit)?
            .with_request_timeout(config.generation.request_timeout())
            .with_observer(observer);

        info!(
            strategy = client.strategy_name(),
            concurrency_limit = config.generation.concurrency_limit,
            "Generation pipeline ready"
        );
        Ok(Self {
            registry,
            client,
            orchestrator,
        })
    }

    pub fn registry(&self) -> &Arc<dyn SectionRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &Arc<ModelClient> {
        &self.client
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn run(&self, requests: Vec<GenerationRequest>) -> Result<ResultMap, GenerationError> {
        self.orchestrator.run(requests).await
    }
}
