// SPDX-License-Identifier: Apache-2.0

//! Concurrent fetch of a working set.
//!
//! Every member gets its own tokio task; a semaphore bounds how many talk to
//! their sources at once. Results come back in completion order and are
//! filed by request id. The first failure aborts collection and closes the
//! semaphore: fetches already holding a permit run to completion detached,
//! queued ones never reach their connector.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::ConnectorRegistry;
use crate::engine::types::{DataRequest, DataRequestId, FetchContext};
use crate::metrics;
use crate::observability::Sensitive;

use super::types::{DispatchResults, DispatchSlot, FetchReport, SkipReason, WorkingSet};

/// Fetches every member of `working_set`.
///
/// With `no_source` set, no connector is called and every slot is empty.
#[instrument(
    skip_all,
    fields(requests = working_set.len(), no_source = no_source, max_concurrent = max_concurrent)
)]
pub async fn dispatch_all(
    registry: &Arc<ConnectorRegistry>,
    working_set: &WorkingSet,
    ctx: &FetchContext,
    no_source: bool,
    max_concurrent: usize,
) -> EngineResult<DispatchResults> {
    debug!(
        filters = ?Sensitive::new(&ctx.filters),
        timezone = ?ctx.timezone,
        get_cache = ctx.get_cache,
        "dispatching working set"
    );

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut pending = FuturesUnordered::new();

    for request in working_set.requests() {
        let registry = Arc::clone(registry);
        let semaphore = Arc::clone(&semaphore);
        let request = request.clone();
        let ctx = ctx.clone();

        pending.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| EngineError::internal(format!("Dispatch semaphore closed: {e}")))?;
            fetch_single(&registry, &request, &ctx, no_source).await
        }));
    }

    let mut results = DispatchResults::with_capacity(working_set.len());

    while let Some(joined) = pending.next().await {
        let outcome = joined
            .map_err(|e| EngineError::internal(format!("Fetch task panicked: {e}")))
            .and_then(|inner| inner);

        match outcome {
            Ok((request_id, slot, report)) => results.insert(request_id, slot, report),
            Err(err) => {
                metrics::record_fetch_failure();
                warn!(
                    error = %err,
                    completed = results.len(),
                    abandoned = pending.len(),
                    "fetch failed, aborting dispatch"
                );
                semaphore.close();
                return Err(err);
            }
        }
    }

    Ok(results)
}

/// Fetches one request, degrading to an empty slot where allowed.
async fn fetch_single(
    registry: &ConnectorRegistry,
    request: &DataRequest,
    ctx: &FetchContext,
    no_source: bool,
) -> EngineResult<(DataRequestId, DispatchSlot, FetchReport)> {
    let connection_type = request.connection.as_ref().map(|c| &c.connection_type);

    if no_source {
        metrics::record_fetch_skipped();
        return Ok((
            request.id,
            DispatchSlot::Empty,
            FetchReport::skipped(request.id, connection_type, SkipReason::NoSource),
        ));
    }

    let Some(connection) = request.connection.as_ref() else {
        warn!(request_id = request.id, "data request has no connection, substituting empty result");
        metrics::record_fetch_skipped();
        return Ok((
            request.id,
            DispatchSlot::Empty,
            FetchReport::skipped(request.id, None, SkipReason::MissingConnection),
        ));
    };

    let start = Instant::now();
    let response = registry.dispatch(connection, request, ctx).await?;
    let fetch_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    if response.data_request.id != request.id {
        return Err(EngineError::invalid_response(format!(
            "connector for '{}' answered data request {} with data request {}",
            connection.connection_type, request.id, response.data_request.id
        )));
    }

    metrics::record_fetch(fetch_time_ms);
    debug!(request_id = request.id, fetch_time_ms, "fetched data request");

    Ok((
        request.id,
        DispatchSlot::Fetched(response.response_data),
        FetchReport {
            request_id: request.id,
            connection_type: Some(connection.connection_type.to_string()),
            fetch_time_ms,
            skipped: None,
        },
    ))
}
