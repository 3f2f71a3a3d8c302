//! In-memory [`Renderer`] for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use weft_primitives::{ComponentId, ComponentType, HasRenderMode, Parameters, RenderMode};

use crate::{RenderError, Renderer};

/// Record of one instance attached to a [`FakeRenderer`].
#[derive(Debug, Clone)]
pub struct FakeComponent {
	pub component_type: ComponentType,
	pub selector: String,
	pub render_mode: RenderMode,
	pub renders: Vec<Parameters>,
}

#[derive(Debug, Default)]
struct FakeState {
	next_id: u64,
	live: HashMap<ComponentId, FakeComponent>,
	known_types: Option<HashSet<ComponentType>>,
	failing_renders: usize,
	failing_adds: usize,
	total_renders: usize,
}

/// Renderer that records every call and suspends once per render.
#[derive(Debug)]
pub struct FakeRenderer {
	mode: RenderMode,
	state: Mutex<FakeState>,
}

impl Default for FakeRenderer {
	fn default() -> Self {
		Self::new(RenderMode::Server)
	}
}

impl FakeRenderer {
	/// Creates a renderer whose instances report `mode`.
	pub fn new(mode: RenderMode) -> Self {
		Self {
			mode,
			state: Mutex::new(FakeState::default()),
		}
	}

	/// Restricts instantiable component types.
	#[must_use]
	pub fn with_known_types<I, T>(self, types: I) -> Self
	where
		I: IntoIterator<Item = T>,
		T: Into<ComponentType>,
	{
		self.state.lock().known_types = Some(types.into_iter().map(Into::into).collect());
		self
	}

	/// Makes the next `count` attaches fail.
	pub fn fail_next_adds(&self, count: usize) {
		self.state.lock().failing_adds = count;
	}

	/// Makes the next `count` renders fail.
	pub fn fail_next_renders(&self, count: usize) {
		self.state.lock().failing_renders = count;
	}

	/// Overrides the render mode one live instance reports.
	pub fn set_render_mode(&self, component: ComponentId, mode: RenderMode) {
		if let Some(live) = self.state.lock().live.get_mut(&component) {
			live.render_mode = mode;
		}
	}

	pub fn component(&self, component: ComponentId) -> Option<FakeComponent> {
		self.state.lock().live.get(&component).cloned()
	}

	pub fn is_live(&self, component: ComponentId) -> bool {
		self.state.lock().live.contains_key(&component)
	}

	pub fn live_count(&self) -> usize {
		self.state.lock().live.len()
	}

	/// Renders performed over the renderer lifetime, failed ones excluded.
	pub fn total_renders(&self) -> usize {
		self.state.lock().total_renders
	}
}

impl HasRenderMode for FakeRenderer {
	fn render_mode_of(&self, component: ComponentId) -> Option<RenderMode> {
		self.state.lock().live.get(&component).map(|live| live.render_mode)
	}
}

#[async_trait]
impl Renderer for FakeRenderer {
	fn add_root_component(&self, component_type: &ComponentType, selector: &str) -> Result<ComponentId, RenderError> {
		let mut state = self.state.lock();
		if let Some(known) = &state.known_types
			&& !known.contains(component_type)
		{
			return Err(RenderError::UnknownComponentType(component_type.clone()));
		}
		if state.failing_adds > 0 {
			state.failing_adds -= 1;
			return Err(RenderError::Failed(format!("injected failure attaching {selector}")));
		}
		state.next_id += 1;
		let id = ComponentId(state.next_id);
		state.live.insert(
			id,
			FakeComponent {
				component_type: component_type.clone(),
				selector: selector.to_string(),
				render_mode: self.mode,
				renders: Vec::new(),
			},
		);
		Ok(id)
	}

	fn remove_root_component(&self, component: ComponentId) -> Result<(), RenderError> {
		self.state.lock().live.remove(&component).map(|_| ()).ok_or(RenderError::UnknownComponent(component))
	}

	async fn render_root_component(&self, component: ComponentId, parameters: &Parameters) -> Result<(), RenderError> {
		tokio::task::yield_now().await;
		let mut state = self.state.lock();
		if state.failing_renders > 0 {
			state.failing_renders -= 1;
			return Err(RenderError::Failed(format!("injected failure rendering {component}")));
		}
		let live = state.live.get_mut(&component).ok_or(RenderError::UnknownComponent(component))?;
		live.renders.push(parameters.clone());
		state.total_renders += 1;
		Ok(())
	}
}
