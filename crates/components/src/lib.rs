//! Root component lifecycle: which component instances are attached to a
//! rendering session, and how client requests add, update and remove them.

pub mod error;
mod handle;
pub mod marker;
pub mod registry;
pub mod renderer;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{RegistryError, RenderError};
pub use handle::{RootComponentHandle, UpdateOutcome};
pub use marker::{InvalidMarkerKey, MarkerKey};
pub use registry::RootComponentRegistry;
pub use renderer::Renderer;
