//! Core types shared by the component registry and the persistence coordinator.

/// Component type identity and parameter sets.
pub mod component;
/// Async future aliases.
pub mod future;
/// Identifier types for rendered component instances.
pub mod ids;
/// Render mode classification.
pub mod render_mode;

pub use component::{ComponentType, Parameters};
pub use future::{BoxFutureSend, BoxFutureStatic, poll_once};
pub use ids::ComponentId;
pub use render_mode::{HasRenderMode, RenderMode};
