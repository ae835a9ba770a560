// SPDX-License-Identifier: Apache-2.0

//! Dataset Federation Engine
//!
//! Resolves the data requests a dataset needs, fetches them concurrently
//! through the connector registry and stitches the record sets together
//! with path-based join rules.

pub mod dispatcher;
pub mod join;
pub mod manager;
pub mod path;
pub mod planner;
pub mod types;

pub use manager::FederationManager;
pub use types::{DatasetResult, RunOptions};
