use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use weft_primitives::BoxFutureStatic;

use crate::{PersistCallback, PersistedStateMap, RegistrationList, RenderModeSource, StateError, Subscription};

/// Component-facing handle to persisted state.
///
/// Cheap to clone. Components register persisting callbacks here, write their
/// state from inside those callbacks, and take restored state back out on the
/// next session.
#[derive(Clone, Default)]
pub struct PersistentComponentState {
	inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
	registrations: RegistrationList,
	restored: Mutex<PersistedStateMap>,
	/// Map being filled by the running pause round, `None` outside a round.
	current: Mutex<Option<PersistedStateMap>>,
}

impl fmt::Debug for PersistentComponentState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PersistentComponentState")
			.field("registrations", &self.inner.registrations.len())
			.field("restored", &self.inner.restored.lock().len())
			.field("persisting", &self.is_persisting())
			.finish()
	}
}

impl PersistentComponentState {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `callback` to run when state is persisted.
	pub fn register_on_persisting<F, Fut>(&self, callback: F, source: RenderModeSource) -> Subscription
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		let callback: PersistCallback = Arc::new(move || -> BoxFutureStatic<anyhow::Result<()>> { Box::pin(callback()) });
		self.inner.registrations.register(callback, source)
	}

	pub fn registrations(&self) -> &RegistrationList {
		&self.inner.registrations
	}

	/// Whether a pause round is collecting state right now.
	pub fn is_persisting(&self) -> bool {
		self.inner.current.lock().is_some()
	}

	/// Stores `bytes` under `key` for the running round.
	pub fn persist(&self, key: impl Into<String>, bytes: Vec<u8>) -> Result<(), StateError> {
		let key = key.into();
		let mut current = self.inner.current.lock();
		let map = current.as_mut().ok_or(StateError::NotPersisting)?;
		if map.contains_key(&key) {
			return Err(StateError::DuplicateKey(key));
		}
		tracing::trace!(key = %key, bytes = bytes.len(), "persist.write");
		map.insert(key, bytes);
		Ok(())
	}

	pub fn persist_json<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<(), StateError> {
		let key = key.into();
		match serde_json::to_vec(value) {
			Ok(bytes) => self.persist(key, bytes),
			Err(source) => Err(StateError::Serialize { key, source }),
		}
	}

	/// Takes restored state for `key`. Each entry is handed out once.
	pub fn try_take(&self, key: &str) -> Option<Vec<u8>> {
		self.inner.restored.lock().remove(key)
	}

	/// Takes and decodes restored JSON state for `key`.
	///
	/// A present entry that fails to decode is consumed anyway.
	pub fn try_take_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
		let Some(bytes) = self.try_take(key) else {
			return Ok(None);
		};
		serde_json::from_slice(&bytes).map(Some).map_err(|source| StateError::Deserialize {
			key: key.to_string(),
			source,
		})
	}

	pub(crate) fn initialize_restored(&self, state: PersistedStateMap) {
		*self.inner.restored.lock() = state;
	}

	/// Opens a fresh map for one pause round.
	pub(crate) fn begin_persisting(&self) -> PersistingScope<'_> {
		*self.inner.current.lock() = Some(PersistedStateMap::new());
		PersistingScope { state: self }
	}
}

/// Open collection window of one pause round. Closes on drop.
pub(crate) struct PersistingScope<'a> {
	state: &'a PersistentComponentState,
}

impl PersistingScope<'_> {
	/// Closes the window and returns what the round collected.
	pub(crate) fn finish(self) -> PersistedStateMap {
		self.state.inner.current.lock().take().unwrap_or_default()
	}
}

impl Drop for PersistingScope<'_> {
	fn drop(&mut self) {
		self.state.inner.current.lock().take();
	}
}
