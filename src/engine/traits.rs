//! Connector trait definition
//!
//! This is the seam every data source plugs into. A connector receives the
//! connection record, the data request to execute and the per-run fetch
//! context, and returns the request's response payload.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::{
    Connection, ConnectionType, ConnectorResponse, DataRequest, FetchContext,
};

/// Core trait that all source connectors must implement
///
/// Connectors own their transport concerns (timeouts, retries, caching);
/// the engine only forwards `FetchContext::get_cache` and expects the
/// returned `data_request.id` to match the request it asked for.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The connection type this connector serves
    fn connection_type(&self) -> ConnectionType;

    /// Executes `request` against `connection`
    async fn fetch(
        &self,
        connection: &Connection,
        request: &DataRequest,
        ctx: &FetchContext,
    ) -> EngineResult<ConnectorResponse>;
}

/// Adapts an async closure into a [`Connector`]
pub struct FnConnector<F> {
    connection_type: ConnectionType,
    fetch: F,
}

/// Wraps `fetch` as a connector for `connection_type`.
///
/// The closure receives owned copies so it can move them into its future.
pub fn connector_fn<F, Fut>(connection_type: ConnectionType, fetch: F) -> Arc<dyn Connector>
where
    F: Fn(Connection, DataRequest, FetchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EngineResult<ConnectorResponse>> + Send + 'static,
{
    Arc::new(FnConnector {
        connection_type,
        fetch,
    })
}

#[async_trait]
impl<F, Fut> Connector for FnConnector<F>
where
    F: Fn(Connection, DataRequest, FetchContext) -> Fut + Send + Sync,
    Fut: Future<Output = EngineResult<ConnectorResponse>> + Send,
{
    fn connection_type(&self) -> ConnectionType {
        self.connection_type.clone()
    }

    async fn fetch(
        &self,
        connection: &Connection,
        request: &DataRequest,
        ctx: &FetchContext,
    ) -> EngineResult<ConnectorResponse> {
        (self.fetch)(connection.clone(), request.clone(), ctx.clone()).await
    }
}
