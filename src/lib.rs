// dataset-federation - multi-source dataset resolution and join engine
// Core library

pub mod config;
pub mod datasets;
pub mod engine;
pub mod federation;
pub mod metrics;
pub mod observability;

use std::sync::Arc;

use config::FederationConfig;
use datasets::DatasetStore;
use engine::ConnectorRegistry;
use federation::FederationManager;

/// Wires a manager from a populated registry and a dataset store.
///
/// Reads configuration from the environment and installs the tracing
/// subscriber it describes.
pub fn build_manager(
    registry: ConnectorRegistry,
    store: Arc<dyn DatasetStore>,
) -> FederationManager {
    let config = FederationConfig::from_env();
    observability::init_tracing(&config.logging);
    FederationManager::new(Arc::new(registry), store, config)
}
