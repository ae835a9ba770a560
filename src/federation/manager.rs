// SPDX-License-Identifier: Apache-2.0

//! Dataset run manager.
//!
//! Orchestrates the full pipeline for one dataset:
//! load → resolve working set → dispatch to connectors → fold joins → return.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::FederationConfig;
use crate::datasets::DatasetStore;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::ConnectorRegistry;
use crate::engine::types::{Dataset, DatasetId, RunId};
use crate::metrics;

use super::dispatcher::dispatch_all;
use super::join::apply_joins;
use super::planner::resolve_working_set;
use super::types::{DatasetResult, RunOptions, RunPhase};

/// Runs datasets against the registered connectors
pub struct FederationManager {
    registry: Arc<ConnectorRegistry>,
    store: Arc<dyn DatasetStore>,
    config: FederationConfig,
}

impl FederationManager {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        store: Arc<dyn DatasetStore>,
        config: FederationConfig,
    ) -> Self {
        let missing = registry.unregistered();
        if !missing.is_empty() {
            debug!(
                missing = ?missing.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
                "some connection types have no connector"
            );
        }
        Self {
            registry,
            store,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Loads dataset `dataset_id` and runs it.
    ///
    /// Returns `NotFound` when the store has no such dataset.
    #[instrument(skip(self, options), fields(run_id = %RunId::new(), chart_id = ?options.chart_id))]
    pub async fn run_request(
        &self,
        dataset_id: DatasetId,
        options: RunOptions,
    ) -> EngineResult<DatasetResult> {
        let dataset = match self.store.find_with_requests(dataset_id).await {
            Ok(Some(dataset)) => dataset,
            Ok(None) => {
                metrics::record_run(0.0, false);
                warn!(phase = %RunPhase::Failed, "dataset not found");
                return Err(EngineError::not_found("Dataset", dataset_id));
            }
            Err(err) => {
                metrics::record_run(0.0, false);
                warn!(phase = %RunPhase::Failed, error = %err, "dataset lookup failed");
                return Err(err);
            }
        };

        self.run_dataset(dataset, &options).await
    }

    /// Runs an already loaded dataset.
    #[instrument(skip_all, fields(dataset_id = dataset.id))]
    pub async fn run_dataset(
        &self,
        dataset: Dataset,
        options: &RunOptions,
    ) -> EngineResult<DatasetResult> {
        let start = Instant::now();
        let mut phase = RunPhase::Resolving;

        let result = self.run_phases(&dataset, options, &mut phase).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::record_run(elapsed_ms, result.is_ok());

        match result {
            Ok(data) => {
                info!(phase = %RunPhase::Done, elapsed_ms, "dataset run complete");
                Ok(DatasetResult {
                    options: dataset,
                    data,
                })
            }
            Err(err) => {
                warn!(
                    phase = %RunPhase::Failed,
                    failed_during = %phase,
                    kind = err.kind(),
                    error = %err,
                    "dataset run failed"
                );
                Err(err)
            }
        }
    }

    async fn run_phases(
        &self,
        dataset: &Dataset,
        options: &RunOptions,
        phase: &mut RunPhase,
    ) -> EngineResult<Value> {
        // Resolving
        let working_set = resolve_working_set(dataset)?;
        debug!(phase = %phase, requests = ?working_set.ids(), "working set resolved");

        // Dispatching
        *phase = RunPhase::Dispatching;
        let results = dispatch_all(
            &self.registry,
            &working_set,
            &options.fetch_context(),
            options.no_source,
            self.config.max_concurrent_fetches,
        )
        .await?;
        debug!(
            phase = %phase,
            fetched = results.len() - results.skipped_count(),
            skipped = results.skipped_count(),
            reports = ?results.reports(),
            "working set dispatched"
        );

        // Joining
        *phase = RunPhase::Joining;
        let main_data = results
            .payload(working_set.main().id)
            .cloned()
            .unwrap_or(Value::Null);

        let joins = dataset.joins();
        if working_set.len() == 1 || joins.is_empty() {
            return Ok(main_data);
        }

        debug!(phase = %phase, joins = joins.len(), "folding joins");
        apply_joins(joins, &results, main_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    use crate::datasets::MemoryDatasetStore;
    use crate::engine::types::DataRequest;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_event_carries_per_request_reports() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let manager = FederationManager::new(
            Arc::new(ConnectorRegistry::new()),
            Arc::new(MemoryDatasetStore::new()),
            FederationConfig::default(),
        );
        let mut dataset = Dataset::new(1);
        dataset.data_requests = vec![DataRequest::new(7, None)];
        let options = RunOptions {
            no_source: true,
            ..RunOptions::default()
        };

        let result = manager.run_dataset(dataset, &options).await.unwrap();
        assert_eq!(result.data, Value::Null);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let dispatched = output
            .lines()
            .find(|line| line.contains("working set dispatched"))
            .unwrap();
        assert!(dispatched.contains("request_id: 7"));
        assert!(dispatched.contains("NoSource"));
    }
}
