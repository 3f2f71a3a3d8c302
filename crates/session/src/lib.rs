//! Session facade over the root component registry and state persistence.
//!
//! A [`Session`] owns its registry and persistence manager inside a single
//! [`Dispatcher`](weft_worker::Dispatcher). Every lifecycle operation, batch,
//! and persistence cycle is one work item, so they never interleave.

pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
mod session;

pub use batch::{BatchError, OperationOutcome, RootComponentOperation};
pub use config::{ConfigError, DispatcherConfig, RootComponentsConfig, SessionConfig};
pub use error::SessionError;
pub use session::Session;
