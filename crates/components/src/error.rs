//! Error types for root component operations.

use thiserror::Error;
use weft_primitives::{ComponentId, ComponentType};

/// Errors reported by a [`Renderer`](crate::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
	/// The renderer cannot instantiate this component type.
	#[error("unknown component type: {0}")]
	UnknownComponentType(ComponentType),

	/// No live instance carries this id.
	#[error("no live component {0}")]
	UnknownComponent(ComponentId),

	/// Rendering failed inside the component.
	#[error("render failed: {0}")]
	Failed(String),
}

/// Errors reported by the root component registry.
///
/// Every variant rejects the operation. A failed update never records the
/// rejected parameters; a replace that lost its instance evicts the component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// The client-supplied marker key does not parse.
	#[error("invalid marker key for root component {external_id}")]
	InvalidKey { external_id: String },

	/// The marker key does not match the one the component was added with.
	#[error("marker key mismatch for root component {external_id}")]
	KeyMismatch { external_id: String },

	/// No root component is registered under this external id.
	#[error("unknown root component {external_id}")]
	UnknownComponent { external_id: String },

	/// A root component is already registered under this external id.
	#[error("root component {external_id} already exists")]
	AlreadyExists { external_id: String },

	/// Adding would exceed the interactive root component limit.
	#[error("root component limit of {limit} reached")]
	CapacityExceeded { limit: usize },

	#[error(transparent)]
	Render(#[from] RenderError),
}
