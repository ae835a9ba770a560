// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{ChartId, Dataset, DatasetId};

/// Read access to persisted datasets.
///
/// Implementations return the dataset with its data requests and their
/// connections already attached.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn find_with_requests(&self, id: DatasetId) -> EngineResult<Option<Dataset>>;
}

/// In-memory dataset store
#[derive(Debug, Default)]
pub struct MemoryDatasetStore {
    datasets: RwLock<HashMap<DatasetId, Dataset>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a JSON array of dataset records.
    pub fn from_json(records: &str) -> EngineResult<Self> {
        let datasets: Vec<Dataset> = serde_json::from_str(records).map_err(|e| {
            EngineError::invalid_config(format!("Failed to parse dataset records: {e}"))
        })?;
        let store = Self::new();
        for dataset in datasets {
            store.insert(dataset);
        }
        Ok(store)
    }

    /// Inserts or replaces a dataset
    pub fn insert(&self, dataset: Dataset) {
        self.datasets.write().insert(dataset.id, dataset);
    }

    /// Removes a dataset, returning it if it existed
    pub fn remove(&self, id: DatasetId) -> Option<Dataset> {
        self.datasets.write().remove(&id)
    }

    pub fn get(&self, id: DatasetId) -> Option<Dataset> {
        self.datasets.read().get(&id).cloned()
    }

    /// Datasets attached to a chart, in ascending `order`
    pub fn list_by_chart(&self, chart_id: ChartId) -> Vec<Dataset> {
        let mut datasets: Vec<Dataset> = self
            .datasets
            .read()
            .values()
            .filter(|d| d.chart_id == Some(chart_id))
            .cloned()
            .collect();
        datasets.sort_by_key(|d| (d.order.unwrap_or(0), d.id));
        datasets
    }

    pub fn len(&self) -> usize {
        self.datasets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.read().is_empty()
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn find_with_requests(&self, id: DatasetId) -> EngineResult<Option<Dataset>> {
        Ok(self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(id: DatasetId, chart_id: ChartId, order: i64) -> Dataset {
        let mut dataset = Dataset::new(id);
        dataset.chart_id = Some(chart_id);
        dataset.order = Some(order);
        dataset
    }

    #[test]
    fn insert_get_remove() {
        let store = MemoryDatasetStore::new();
        assert!(store.is_empty());

        store.insert(dataset(1, 10, 0));
        assert_eq!(store.get(1).map(|d| d.id), Some(1));
        assert_eq!(store.len(), 1);

        assert!(store.remove(1).is_some());
        assert!(store.get(1).is_none());
        assert!(store.remove(1).is_none());
    }

    #[test]
    fn lists_chart_datasets_in_order() {
        let store = MemoryDatasetStore::new();
        store.insert(dataset(1, 10, 2));
        store.insert(dataset(2, 10, 0));
        store.insert(dataset(3, 11, 1));
        store.insert(dataset(4, 10, 1));

        let ids: Vec<DatasetId> = store.list_by_chart(10).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 4, 1]);
    }

    #[test]
    fn loads_records_from_json() {
        let store = MemoryDatasetStore::from_json(
            r#"[{ "id": 1, "DataRequests": [{ "id": 3 }] }, { "id": 2 }]"#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().data_requests[0].id, 3);

        let err = MemoryDatasetStore::from_json("{").unwrap_err();
        assert_eq!(err.kind(), "invalid_config");
    }

    #[tokio::test]
    async fn store_trait_returns_none_for_unknown_ids() {
        let store = MemoryDatasetStore::new();
        assert!(store.find_with_requests(5).await.unwrap().is_none());
    }
}
