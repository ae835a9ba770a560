// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the dataset federation engine
//!
//! Connector errors are propagated unchanged; everything the engine itself
//! detects is mapped to one of these kinds so callers can classify failures
//! without string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::types::DataRequestId;

/// Unified error type for all federation operations
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Dataset {dataset_id} has no main data request")]
    NoMainRequest { dataset_id: String },

    #[error("Unsupported connection type: {connection_type}")]
    UnsupportedConnectionType { connection_type: String },

    #[error("Connector failed for data request {request_id}: {message}")]
    ConnectorFailure {
        request_id: DataRequestId,
        message: String,
    },

    #[error("Invalid connector response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn no_main_request(dataset_id: impl ToString) -> Self {
        Self::NoMainRequest {
            dataset_id: dataset_id.to_string(),
        }
    }

    pub fn unsupported_connection_type(connection_type: impl ToString) -> Self {
        Self::UnsupportedConnectionType {
            connection_type: connection_type.to_string(),
        }
    }

    pub fn connector_failure(request_id: DataRequestId, msg: impl Into<String>) -> Self {
        Self::ConnectorFailure {
            request_id,
            message: msg.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse { message: msg.into() }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    /// Stable tag for the error kind, suitable for mapping to transport codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NoMainRequest { .. } => "no_main_request",
            Self::UnsupportedConnectionType { .. } => "unsupported_connection_type",
            Self::ConnectorFailure { .. } => "connector_failure",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::InvalidConfig { .. } => "invalid_config",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
