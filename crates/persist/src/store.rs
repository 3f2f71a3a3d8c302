use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashSet as HashSet;
use weft_primitives::RenderMode;

use crate::StoreError;

/// Opaque state payloads keyed by a component-chosen name.
pub type PersistedStateMap = HashMap<String, Vec<u8>>;

/// Storage backend the persistence coordinator reads from and writes to.
#[async_trait]
pub trait PersistentStateStore: Send + Sync {
	/// Loads the state persisted by an earlier session.
	async fn persisted_state(&self) -> Result<PersistedStateMap, StoreError>;

	/// Commits the state collected by one pause round.
	async fn persist_state(&self, state: PersistedStateMap) -> Result<(), StoreError>;

	/// Whether callbacks of components in `mode` may contribute to this store.
	fn supports_render_mode(&self, mode: RenderMode) -> bool;

	/// Ordered sub-stores, when this store is a sequence of stores.
	///
	/// The coordinator runs one pause round and one commit per sub-store.
	fn sub_stores(&self) -> Option<&[Arc<dyn PersistentStateStore>]> {
		None
	}
}

/// In-memory store accepting a fixed set of render modes.
#[derive(Debug, Default)]
pub struct MemoryStore {
	modes: HashSet<RenderMode>,
	state: Mutex<PersistedStateMap>,
	commits: AtomicUsize,
}

impl MemoryStore {
	pub fn new(modes: impl IntoIterator<Item = RenderMode>) -> Self {
		Self {
			modes: modes.into_iter().collect(),
			..Self::default()
		}
	}

	/// Store accepting every render mode.
	pub fn all_modes() -> Self {
		Self::new(RenderMode::ALL)
	}

	/// Seeds the state returned by [`PersistentStateStore::persisted_state`].
	#[must_use]
	pub fn with_state(self, state: PersistedStateMap) -> Self {
		*self.state.lock() = state;
		self
	}

	/// Current contents.
	pub fn snapshot(&self) -> PersistedStateMap {
		self.state.lock().clone()
	}

	/// Number of successful commits.
	pub fn commits(&self) -> usize {
		self.commits.load(Ordering::Acquire)
	}
}

#[async_trait]
impl PersistentStateStore for MemoryStore {
	async fn persisted_state(&self) -> Result<PersistedStateMap, StoreError> {
		Ok(self.snapshot())
	}

	async fn persist_state(&self, state: PersistedStateMap) -> Result<(), StoreError> {
		*self.state.lock() = state;
		self.commits.fetch_add(1, Ordering::AcqRel);
		Ok(())
	}

	fn supports_render_mode(&self, mode: RenderMode) -> bool {
		self.modes.contains(&mode)
	}
}

/// Ordered sequence of stores, each receiving only the state of the
/// render modes it supports.
#[derive(Default)]
pub struct CompositeStore {
	stores: Vec<Arc<dyn PersistentStateStore>>,
}

impl CompositeStore {
	pub fn new(stores: Vec<Arc<dyn PersistentStateStore>>) -> Self {
		Self { stores }
	}

	#[must_use]
	pub fn with(mut self, store: Arc<dyn PersistentStateStore>) -> Self {
		self.stores.push(store);
		self
	}

	pub fn len(&self) -> usize {
		self.stores.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stores.is_empty()
	}
}

#[async_trait]
impl PersistentStateStore for CompositeStore {
	/// Merges sub-store state in order; earlier stores win on key collisions.
	async fn persisted_state(&self) -> Result<PersistedStateMap, StoreError> {
		let mut merged = PersistedStateMap::new();
		for store in &self.stores {
			for (key, bytes) in store.persisted_state().await? {
				merged.entry(key).or_insert(bytes);
			}
		}
		Ok(merged)
	}

	/// Writes the same map to every sub-store. The coordinator never calls
	/// this; it commits to each sub-store separately.
	async fn persist_state(&self, state: PersistedStateMap) -> Result<(), StoreError> {
		for store in &self.stores {
			store.persist_state(state.clone()).await?;
		}
		Ok(())
	}

	fn supports_render_mode(&self, mode: RenderMode) -> bool {
		self.stores.iter().any(|store| store.supports_render_mode(mode))
	}

	fn sub_stores(&self) -> Option<&[Arc<dyn PersistentStateStore>]> {
		Some(&self.stores)
	}
}
