// SPDX-License-Identifier: Apache-2.0

//! Working-set planner.
//!
//! Decides which data requests a dataset run must fetch: the main request
//! plus every request the configured joins reference.

use tracing::debug;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{DataRequest, Dataset};

use super::types::WorkingSet;

/// Builds the working set for `dataset`.
///
/// 1. Picks the main request (`main_dr_id`, else the first request)
/// 2. Walks the joins once, appending each referenced request on first sight
///
/// Joins missing an id or a field path pull in nothing, and ids that do not
/// belong to the dataset are ignored.
pub fn resolve_working_set(dataset: &Dataset) -> EngineResult<WorkingSet> {
    let main = dataset
        .main_request()
        .ok_or_else(|| EngineError::no_main_request(dataset.id))?;

    if dataset.main_dr_id.is_some_and(|id| id != main.id) {
        debug!(
            dataset_id = dataset.id,
            main_dr_id = ?dataset.main_dr_id,
            fallback = main.id,
            "main data request not found, using first request"
        );
    }

    let mut dependencies: Vec<DataRequest> = Vec::new();
    for join in dataset.joins().iter().filter(|j| j.references_requests()) {
        for id in [join.dr_id, join.join_id].into_iter().flatten() {
            if id == main.id || dependencies.iter().any(|dr| dr.id == id) {
                continue;
            }
            if let Some(request) = dataset.request(id) {
                dependencies.push(request.clone());
            }
        }
    }

    Ok(WorkingSet::new(main.clone(), dependencies))
}
