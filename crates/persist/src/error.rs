//! Error types for state persistence.

use thiserror::Error;
use weft_primitives::ComponentId;

/// Errors reported by a [`PersistentStateStore`](crate::PersistentStateStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// The storage backend rejected the operation.
	#[error("state store backend failed: {0}")]
	Backend(String),

	/// Stored bytes could not be decoded into a state map.
	#[error("persisted state is corrupt: {0}")]
	Corrupt(String),
}

/// Errors that abort a persistence or restore cycle.
#[derive(Debug, Error)]
pub enum PersistError {
	/// A registration has no explicit render mode and its owner does not
	/// resolve to a live component. This is a programming error, not retried.
	#[error("cannot determine the render mode of a persistence callback (owner: {owner:?})")]
	Configuration { owner: Option<ComponentId> },

	/// State was already persisted for this session.
	#[error("state already persisted")]
	AlreadyPersisted,

	/// State was already restored for this session.
	#[error("state already restored")]
	AlreadyRestored,

	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Errors from the component-facing state API.
#[derive(Debug, Error)]
pub enum StateError {
	/// Writes are only accepted while a pause round is running.
	#[error("state can only be persisted from a persisting callback")]
	NotPersisting,

	/// Another callback already persisted under this key in the current round.
	#[error("state already persisted under key {0:?}")]
	DuplicateKey(String),

	#[error("failed to serialize state for key {key:?}: {source}")]
	Serialize { key: String, source: serde_json::Error },

	#[error("failed to deserialize state for key {key:?}: {source}")]
	Deserialize { key: String, source: serde_json::Error },
}
