//! Persistence callback registrations.
//!
//! Registrations live in a generation-stamped slab. A [`Subscription`] names
//! its slot by `(index, generation)` so disposing after the slot was reused by
//! a newer registration cannot remove the wrong callback.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slab::Slab;
use weft_primitives::{BoxFutureStatic, ComponentId, HasRenderMode, RenderMode};

use crate::PersistError;

/// Callback invoked once per pause round for a compatible store.
pub type PersistCallback = Arc<dyn Fn() -> BoxFutureStatic<anyhow::Result<()>> + Send + Sync>;

/// How a registration's render mode is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderModeSource {
	/// Mode fixed at registration time.
	Explicit(RenderMode),
	/// Mode of the owning component, looked up just before persisting.
	Owner(ComponentId),
}

struct Registration {
	generation: u64,
	owner: Option<ComponentId>,
	mode: Option<RenderMode>,
	callback: PersistCallback,
}

#[derive(Default)]
struct Slots {
	entries: Slab<Registration>,
	next_generation: u64,
}

/// Shared list of persistence registrations.
#[derive(Clone, Default)]
pub struct RegistrationList {
	slots: Arc<Mutex<Slots>>,
}

impl fmt::Debug for RegistrationList {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RegistrationList").field("len", &self.len()).finish()
	}
}

impl RegistrationList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, callback: PersistCallback, source: RenderModeSource) -> Subscription {
		let (owner, mode) = match source {
			RenderModeSource::Explicit(mode) => (None, Some(mode)),
			RenderModeSource::Owner(owner) => (Some(owner), None),
		};

		let mut slots = self.slots.lock();
		let generation = slots.next_generation;
		slots.next_generation += 1;
		let index = slots.entries.insert(Registration {
			generation,
			owner,
			mode,
			callback,
		});
		tracing::trace!(index, generation, ?owner, ?mode, "persist.register");

		Subscription {
			list: Arc::downgrade(&self.slots),
			index,
			generation,
		}
	}

	pub fn len(&self) -> usize {
		self.slots.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Resolves the render mode of every registration that has none yet.
	///
	/// Fails on the first registration whose owner is not a live component.
	/// Nothing is written back unless every registration resolves.
	/// Returns how many modes were inferred.
	pub(crate) fn infer_render_modes(&self, lookup: &dyn HasRenderMode) -> Result<usize, PersistError> {
		let mut slots = self.slots.lock();
		let mut inferred = Vec::new();
		for (index, registration) in slots.entries.iter() {
			if registration.mode.is_some() {
				continue;
			}
			let mode = registration
				.owner
				.and_then(|owner| lookup.render_mode_of(owner))
				.ok_or(PersistError::Configuration { owner: registration.owner })?;
			inferred.push((index, mode));
		}

		for &(index, mode) in &inferred {
			if let Some(registration) = slots.entries.get_mut(index) {
				registration.mode = Some(mode);
			}
		}
		Ok(inferred.len())
	}

	/// Callbacks whose resolved render mode satisfies `accepts`.
	///
	/// Registrations without a resolved mode are skipped.
	pub(crate) fn compatible(&self, accepts: impl Fn(RenderMode) -> bool) -> Vec<PersistCallback> {
		self.slots
			.lock()
			.entries
			.iter()
			.filter(|(_, registration)| registration.mode.is_some_and(&accepts))
			.map(|(_, registration)| Arc::clone(&registration.callback))
			.collect()
	}
}

/// Handle that removes one registration when disposed.
///
/// Dropping the handle does not unregister.
#[derive(Debug, Clone)]
pub struct Subscription {
	list: Weak<Mutex<Slots>>,
	index: usize,
	generation: u64,
}

impl Subscription {
	/// Removes the registration. Returns whether anything was removed.
	///
	/// Idempotent: later calls, a dropped list, or a slot already reused by a
	/// newer registration all leave the list untouched.
	pub fn dispose(&self) -> bool {
		let Some(list) = self.list.upgrade() else {
			return false;
		};
		let mut slots = list.lock();
		let matches = slots.entries.get(self.index).is_some_and(|registration| registration.generation == self.generation);
		if matches {
			slots.entries.remove(self.index);
			tracing::trace!(index = self.index, generation = self.generation, "persist.dispose");
		}
		matches
	}
}
