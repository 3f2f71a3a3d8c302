use weft_primitives::{ComponentId, ComponentType, Parameters};

use crate::{MarkerKey, RegistryError, RenderError, Renderer};

/// Result of a successful [`RootComponentRegistry::update`](crate::RootComponentRegistry::update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
	/// The existing instance was re-rendered with the new parameters.
	Rendered,
	/// Parameters were structurally equal; nothing was rendered.
	Unchanged,
	/// The instance was torn down and recreated under a new id.
	Replaced { previous: ComponentId, current: ComponentId },
}

/// One root component instance attached to the session.
#[derive(Debug, Clone)]
pub struct RootComponentHandle {
	external_id: String,
	selector: String,
	component_type: ComponentType,
	interactive_id: ComponentId,
	key: String,
	latest_parameters: Parameters,
	can_receive_new_parameters: bool,
	/// The live instance has not rendered `latest_parameters` yet.
	stale: bool,
	/// No live instance backs this handle anymore.
	detached: bool,
}

impl RootComponentHandle {
	/// Parses `key`, attaches a new instance to the renderer and renders it once.
	///
	/// The instance is detached again if the initial render fails.
	pub(crate) async fn create(
		renderer: &dyn Renderer,
		external_id: String,
		component_type: ComponentType,
		parameters: Parameters,
		key: String,
	) -> Result<Self, RegistryError> {
		let Some(marker) = MarkerKey::parse(&key) else {
			return Err(RegistryError::InvalidKey { external_id });
		};

		let selector = selector_for(&external_id);
		let interactive_id = renderer.add_root_component(&component_type, &selector)?;
		if let Err(err) = renderer.render_root_component(interactive_id, &parameters).await {
			if let Err(detach) = renderer.remove_root_component(interactive_id) {
				tracing::warn!(%external_id, component = %interactive_id, error = %detach, "registry.add.detach_failed");
			}
			return Err(err.into());
		}

		Ok(Self {
			external_id,
			selector,
			component_type,
			interactive_id,
			key,
			latest_parameters: parameters,
			can_receive_new_parameters: marker.has_component_key(),
			stale: false,
			detached: false,
		})
	}

	/// Applies a new parameter set according to the handle's update policy.
	///
	/// Components that declared their own key re-render in place. Any other
	/// component is only ever re-rendered through replacement, so a client can
	/// never route parameters into an instance whose identity it does not own.
	///
	/// `latest_parameters` only changes once a render succeeds. When a replace
	/// detached the old instance but could not attach a new one, the handle is
	/// marked detached and must be dropped by the caller.
	pub(crate) async fn apply(&mut self, renderer: &dyn Renderer, parameters: Parameters) -> Result<UpdateOutcome, RegistryError> {
		if self.can_receive_new_parameters {
			renderer.render_root_component(self.interactive_id, &parameters).await?;
			self.latest_parameters = parameters;
			return Ok(UpdateOutcome::Rendered);
		}

		if !self.stale && parameters == self.latest_parameters {
			return Ok(UpdateOutcome::Unchanged);
		}

		let previous = self.interactive_id;
		match renderer.remove_root_component(previous) {
			Ok(()) | Err(RenderError::UnknownComponent(_)) => {}
			Err(err) => return Err(err.into()),
		}
		let current = match renderer.add_root_component(&self.component_type, &self.selector) {
			Ok(current) => current,
			Err(err) => {
				self.detached = true;
				return Err(err.into());
			}
		};
		self.interactive_id = current;
		self.stale = true;

		renderer.render_root_component(current, &parameters).await?;
		self.latest_parameters = parameters;
		self.stale = false;
		Ok(UpdateOutcome::Replaced { previous, current })
	}

	pub(crate) fn is_detached(&self) -> bool {
		self.detached
	}

	pub fn external_id(&self) -> &str {
		&self.external_id
	}

	/// Name the instance is registered under with the renderer.
	pub fn selector(&self) -> &str {
		&self.selector
	}

	pub fn component_type(&self) -> &ComponentType {
		&self.component_type
	}

	pub fn interactive_id(&self) -> ComponentId {
		self.interactive_id
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn latest_parameters(&self) -> &Parameters {
		&self.latest_parameters
	}

	pub fn can_receive_new_parameters(&self) -> bool {
		self.can_receive_new_parameters
	}
}

fn selector_for(external_id: &str) -> String {
	format!("root:{external_id}")
}
