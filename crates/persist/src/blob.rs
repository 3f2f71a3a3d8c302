use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use rustc_hash::FxHashSet as HashSet;
use weft_primitives::RenderMode;

use crate::{PersistedStateMap, PersistentStateStore, StoreError};

/// Store that keeps the whole state map as one opaque text blob.
///
/// Used when the transport ships persisted state inside a single document
/// field: the blob is base64 over a JSON object whose values are themselves
/// base64 payloads.
#[derive(Debug, Default)]
pub struct BlobStore {
	modes: HashSet<RenderMode>,
	blob: Mutex<Option<String>>,
}

impl BlobStore {
	pub fn new(modes: impl IntoIterator<Item = RenderMode>) -> Self {
		Self {
			modes: modes.into_iter().collect(),
			blob: Mutex::new(None),
		}
	}

	/// Seeds the store with a blob produced by an earlier session.
	#[must_use]
	pub fn with_blob(self, blob: impl Into<String>) -> Self {
		*self.blob.lock() = Some(blob.into());
		self
	}

	/// Encoded blob from the last commit, if any.
	pub fn blob(&self) -> Option<String> {
		self.blob.lock().clone()
	}
}

fn encode(state: &PersistedStateMap) -> Result<String, StoreError> {
	let entries: BTreeMap<&str, String> = state.iter().map(|(key, bytes)| (key.as_str(), STANDARD.encode(bytes))).collect();
	let json = serde_json::to_vec(&entries).map_err(|err| StoreError::Backend(err.to_string()))?;
	Ok(STANDARD.encode(json))
}

fn decode(blob: &str) -> Result<PersistedStateMap, StoreError> {
	let json = STANDARD.decode(blob.trim()).map_err(|err| StoreError::Corrupt(err.to_string()))?;
	let entries: BTreeMap<String, String> = serde_json::from_slice(&json).map_err(|err| StoreError::Corrupt(err.to_string()))?;
	entries
		.into_iter()
		.map(|(key, value)| match STANDARD.decode(value) {
			Ok(bytes) => Ok((key, bytes)),
			Err(err) => Err(StoreError::Corrupt(format!("entry {key:?}: {err}"))),
		})
		.collect()
}

#[async_trait]
impl PersistentStateStore for BlobStore {
	async fn persisted_state(&self) -> Result<PersistedStateMap, StoreError> {
		match self.blob() {
			Some(blob) if !blob.trim().is_empty() => decode(&blob),
			_ => Ok(PersistedStateMap::new()),
		}
	}

	async fn persist_state(&self, state: PersistedStateMap) -> Result<(), StoreError> {
		let blob = encode(&state)?;
		*self.blob.lock() = Some(blob);
		Ok(())
	}

	fn supports_render_mode(&self, mode: RenderMode) -> bool {
		self.modes.contains(&mode)
	}
}
