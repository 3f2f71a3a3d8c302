use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;
use weft_primitives::{ComponentId, ComponentType, Parameters};

use crate::{RegistryError, RenderError, Renderer, RootComponentHandle, UpdateOutcome};

/// Root components currently attached to one rendering session.
///
/// Callers must serialize access: the registry assumes exclusive use for the
/// duration of each call, which the session dispatcher provides by owning it.
pub struct RootComponentRegistry {
	renderer: Arc<dyn Renderer>,
	components: HashMap<String, RootComponentHandle>,
	limit: Option<usize>,
}

impl RootComponentRegistry {
	/// Creates an empty registry.
	///
	/// `limit` bounds concurrently attached root components; pass `None` for
	/// modes without such a bound.
	pub fn new(renderer: Arc<dyn Renderer>, limit: Option<usize>) -> Self {
		Self {
			renderer,
			components: HashMap::default(),
			limit,
		}
	}

	/// Attaches and renders a new root component.
	pub async fn add(
		&mut self,
		external_id: impl Into<String>,
		component_type: ComponentType,
		parameters: Parameters,
		key: impl Into<String>,
	) -> Result<ComponentId, RegistryError> {
		let external_id = external_id.into();
		if let Some(limit) = self.limit
			&& self.components.len() >= limit
		{
			tracing::warn!(%external_id, limit, "registry.add.capacity_exceeded");
			return Err(RegistryError::CapacityExceeded { limit });
		}
		if self.components.contains_key(&external_id) {
			return Err(RegistryError::AlreadyExists { external_id });
		}

		let handle = RootComponentHandle::create(self.renderer.as_ref(), external_id.clone(), component_type, parameters, key.into()).await?;
		let id = handle.interactive_id();
		tracing::debug!(
			%external_id,
			component = %id,
			component_type = %handle.component_type(),
			in_place_updates = handle.can_receive_new_parameters(),
			"registry.add"
		);
		self.components.insert(external_id, handle);
		Ok(id)
	}

	/// Applies new parameters to an attached root component.
	///
	/// `key` must equal the key the component was added with, byte for byte.
	/// A replace that detached the old instance but failed to attach a new
	/// one forgets the component, freeing its slot.
	pub async fn update(&mut self, external_id: &str, parameters: Parameters, key: &str) -> Result<UpdateOutcome, RegistryError> {
		let Some(handle) = self.components.get_mut(external_id) else {
			return Err(RegistryError::UnknownComponent {
				external_id: external_id.to_string(),
			});
		};
		if handle.key() != key {
			tracing::warn!(%external_id, "registry.update.key_mismatch");
			return Err(RegistryError::KeyMismatch {
				external_id: external_id.to_string(),
			});
		}

		let result = handle.apply(self.renderer.as_ref(), parameters).await;
		if handle.is_detached() {
			self.components.remove(external_id);
			tracing::warn!(%external_id, "registry.update.evicted");
		}

		let outcome = result?;
		tracing::debug!(%external_id, ?outcome, "registry.update");
		Ok(outcome)
	}

	/// Detaches a root component and forgets it.
	///
	/// An instance the renderer no longer knows counts as already detached.
	pub fn remove(&mut self, external_id: &str) -> Result<RootComponentHandle, RegistryError> {
		let Some(handle) = self.components.remove(external_id) else {
			return Err(RegistryError::UnknownComponent {
				external_id: external_id.to_string(),
			});
		};
		match self.renderer.remove_root_component(handle.interactive_id()) {
			Ok(()) => {}
			Err(RenderError::UnknownComponent(component)) => {
				tracing::debug!(%external_id, %component, "registry.remove.already_detached");
			}
			Err(err) => {
				self.components.insert(external_id.to_string(), handle);
				return Err(err.into());
			}
		}

		tracing::debug!(%external_id, component = %handle.interactive_id(), "registry.remove");
		Ok(handle)
	}

	/// Detaches every root component, e.g. when the session ends.
	///
	/// Renderer failures are logged; the registry is empty afterwards.
	pub fn clear(&mut self) -> usize {
		let count = self.components.len();
		for (external_id, handle) in self.components.drain() {
			if let Err(err) = self.renderer.remove_root_component(handle.interactive_id()) {
				tracing::warn!(%external_id, error = %err, "registry.clear.detach_failed");
			}
		}
		count
	}

	pub fn get(&self, external_id: &str) -> Option<&RootComponentHandle> {
		self.components.get(external_id)
	}

	pub fn contains(&self, external_id: &str) -> bool {
		self.components.contains_key(external_id)
	}

	pub fn len(&self) -> usize {
		self.components.len()
	}

	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	pub fn limit(&self) -> Option<usize> {
		self.limit
	}

	pub fn iter(&self) -> impl Iterator<Item = &RootComponentHandle> {
		self.components.values()
	}

	pub fn renderer(&self) -> &Arc<dyn Renderer> {
		&self.renderer
	}
}

#[cfg(test)]
mod tests;
