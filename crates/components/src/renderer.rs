use async_trait::async_trait;
use weft_primitives::{ComponentId, ComponentType, HasRenderMode, Parameters};

use crate::RenderError;

/// Seam to the rendering engine that turns component trees into patches.
///
/// The registry only attaches, detaches and renders root instances; the
/// renderer owns everything below them. Implementations report render modes
/// through [`HasRenderMode`] so persistence can classify registrations.
#[async_trait]
pub trait Renderer: HasRenderMode {
	/// Instantiates a root component and returns its interactive id.
	fn add_root_component(&self, component_type: &ComponentType, selector: &str) -> Result<ComponentId, RenderError>;

	/// Detaches a root component instance.
	fn remove_root_component(&self, component: ComponentId) -> Result<(), RenderError>;

	/// Renders a root component with a full parameter set.
	async fn render_root_component(&self, component: ComponentId, parameters: &Parameters) -> Result<(), RenderError>;
}
