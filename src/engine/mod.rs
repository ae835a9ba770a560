// Data Engine Module
// Data model, connector seam and error types shared by the federation layer

pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use registry::ConnectorRegistry;
pub use traits::{connector_fn, Connector};
pub use types::*;
