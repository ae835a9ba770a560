// SPDX-License-Identifier: Apache-2.0

//! Types for the dataset federation pipeline.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::engine::types::{
    ChartId, ConnectionType, DataRequest, DataRequestId, Dataset, FetchContext, ResponseData,
};

/// The requests a dataset run has to fetch, main request first.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    requests: Vec<DataRequest>,
}

impl WorkingSet {
    /// Builds a working set from `main` followed by its join dependencies.
    pub(crate) fn new(main: DataRequest, dependencies: Vec<DataRequest>) -> Self {
        let mut requests = Vec::with_capacity(dependencies.len() + 1);
        requests.push(main);
        requests.extend(dependencies);
        Self { requests }
    }

    pub fn main(&self) -> &DataRequest {
        &self.requests[0]
    }

    pub fn requests(&self) -> &[DataRequest] {
        &self.requests
    }

    pub fn ids(&self) -> Vec<DataRequestId> {
        self.requests.iter().map(|dr| dr.id).collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Always false; a working set holds at least its main request.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Outcome of one working-set member
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchSlot {
    /// The connector returned a payload
    Fetched(ResponseData),
    /// Dispatch was skipped (no source requested, or no connection record)
    Empty,
}

/// Why a slot ended up empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoSource,
    MissingConnection,
}

/// Per-request fetch metadata
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub request_id: DataRequestId,
    pub connection_type: Option<String>,
    pub fetch_time_ms: f64,
    pub skipped: Option<SkipReason>,
}

/// Dispatched payloads keyed by request id.
///
/// Completion order is irrelevant; lookups always go through the id.
#[derive(Debug, Clone, Default)]
pub struct DispatchResults {
    slots: HashMap<DataRequestId, DispatchSlot>,
    reports: Vec<FetchReport>,
}

impl DispatchResults {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            reports: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, request_id: DataRequestId, slot: DispatchSlot, report: FetchReport) {
        self.slots.insert(request_id, slot);
        self.reports.push(report);
    }

    /// Records a fetched payload with no timing information.
    pub fn insert_fetched(&mut self, request_id: DataRequestId, data: Value) {
        self.insert(
            request_id,
            DispatchSlot::Fetched(ResponseData::new(data)),
            FetchReport {
                request_id,
                connection_type: None,
                fetch_time_ms: 0.0,
                skipped: None,
            },
        );
    }

    pub fn slot(&self, request_id: DataRequestId) -> Option<&DispatchSlot> {
        self.slots.get(&request_id)
    }

    /// The fetched `data` for a request; `None` for empty or unknown slots.
    pub fn payload(&self, request_id: DataRequestId) -> Option<&Value> {
        match self.slots.get(&request_id)? {
            DispatchSlot::Fetched(response) => Some(&response.data),
            DispatchSlot::Empty => None,
        }
    }

    pub fn reports(&self) -> &[FetchReport] {
        &self.reports
    }

    pub fn skipped_count(&self) -> usize {
        self.reports.iter().filter(|r| r.skipped.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Caller-supplied switches for one dataset run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub chart_id: Option<ChartId>,
    /// Skip every connector and substitute empty slots
    pub no_source: bool,
    /// Allow connectors to answer from their cache
    pub get_cache: bool,
    pub filters: Option<Value>,
    pub timezone: Option<String>,
}

impl RunOptions {
    pub fn fetch_context(&self) -> FetchContext {
        FetchContext {
            get_cache: self.get_cache,
            filters: self.filters.clone(),
            timezone: self.timezone.clone(),
            chart_id: self.chart_id,
        }
    }
}

/// Final output of a dataset run
#[derive(Debug, Clone, Serialize)]
pub struct DatasetResult {
    /// The dataset record the data was produced for
    pub options: Dataset,
    pub data: Value,
}

/// Lifecycle of a dataset run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Resolving,
    Dispatching,
    Joining,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Dispatching => "dispatching",
            Self::Joining => "joining",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl FetchReport {
    pub(crate) fn skipped(
        request_id: DataRequestId,
        connection_type: Option<&ConnectionType>,
        reason: SkipReason,
    ) -> Self {
        Self {
            request_id,
            connection_type: connection_type.map(|t| t.to_string()),
            fetch_time_ms: 0.0,
            skipped: Some(reason),
        }
    }
}
