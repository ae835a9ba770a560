//! Connector Registry
//!
//! Central registry for all available source connectors.
//! Adding a new source type is a registration, not a new branch.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::Connector;
use crate::engine::types::{
    Connection, ConnectionType, ConnectorResponse, DataRequest, FetchContext,
};

/// Registry that maps connection types to their connectors
pub struct ConnectorRegistry {
    connectors: HashMap<ConnectionType, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            connectors: HashMap::new(),
        }
    }

    /// Registers a connector
    ///
    /// The connector's `connection_type()` is used as the key; registering
    /// the same type twice replaces the earlier connector.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.connection_type(), connector);
    }

    /// Registers one connector under several types (e.g. postgres + mysql).
    pub fn register_as(&mut self, types: &[ConnectionType], connector: Arc<dyn Connector>) {
        for kind in types {
            self.connectors.insert(kind.clone(), Arc::clone(&connector));
        }
    }

    /// Gets a connector by connection type
    pub fn get(&self, connection_type: &ConnectionType) -> Option<Arc<dyn Connector>> {
        self.connectors.get(connection_type).cloned()
    }

    /// Lists all registered connection types, sorted by tag
    pub fn list(&self) -> Vec<&ConnectionType> {
        let mut types: Vec<&ConnectionType> = self.connectors.keys().collect();
        types.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        types
    }

    /// Known connection types that have no connector registered
    pub fn unregistered(&self) -> Vec<ConnectionType> {
        ConnectionType::KNOWN
            .iter()
            .filter(|kind| !self.connectors.contains_key(*kind))
            .cloned()
            .collect()
    }

    /// Returns the number of registered connection types
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    /// Returns true if no connectors are registered
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Routes a fetch to the connector registered for `connection`'s type
    #[instrument(
        skip(self, connection, request, ctx),
        fields(
            connection_id = connection.id,
            connection_type = %connection.connection_type,
            request_id = request.id
        )
    )]
    pub async fn dispatch(
        &self,
        connection: &Connection,
        request: &DataRequest,
        ctx: &FetchContext,
    ) -> EngineResult<ConnectorResponse> {
        let connector = self
            .get(&connection.connection_type)
            .ok_or_else(|| EngineError::unsupported_connection_type(&connection.connection_type))?;

        connector.fetch(connection, request, ctx).await
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
