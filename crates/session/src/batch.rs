//! Root component operation batches received from the transport.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_components::{RegistryError, RootComponentRegistry, UpdateOutcome};
use weft_primitives::{ComponentId, ComponentType, Parameters};

/// One client request against the root component registry.
///
/// Wire shape: `{"type": "add" | "update" | "remove", "externalId": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RootComponentOperation {
	Add {
		external_id: String,
		component_type: ComponentType,
		#[serde(default)]
		parameters: Parameters,
		#[serde(default)]
		key: String,
	},
	Update {
		external_id: String,
		#[serde(default)]
		parameters: Parameters,
		#[serde(default)]
		key: String,
	},
	Remove {
		external_id: String,
	},
}

impl RootComponentOperation {
	pub fn external_id(&self) -> &str {
		match self {
			Self::Add { external_id, .. } | Self::Update { external_id, .. } | Self::Remove { external_id } => external_id,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Add { .. } => "add",
			Self::Update { .. } => "update",
			Self::Remove { .. } => "remove",
		}
	}

	pub(crate) async fn apply(self, registry: &mut RootComponentRegistry) -> Result<OperationOutcome, RegistryError> {
		match self {
			Self::Add {
				external_id,
				component_type,
				parameters,
				key,
			} => registry.add(external_id, component_type, parameters, key).await.map(OperationOutcome::Added),
			Self::Update { external_id, parameters, key } => registry.update(&external_id, parameters, &key).await.map(OperationOutcome::Updated),
			Self::Remove { external_id } => registry.remove(&external_id).map(|handle| OperationOutcome::Removed(handle.interactive_id())),
		}
	}
}

/// Result of one applied operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
	Added(ComponentId),
	Updated(UpdateOutcome),
	Removed(ComponentId),
}

/// Why a batch stopped.
#[derive(Debug, Error)]
pub enum BatchError {
	/// The payload is not an array of operations. Nothing was applied.
	#[error("malformed operation batch: {0}")]
	Malformed(#[from] serde_json::Error),

	/// Operation `index` failed. Operations before it stay applied, later ones were skipped.
	#[error("operation {index} ({kind} {external_id:?}) failed: {source}")]
	Operation {
		index: usize,
		kind: &'static str,
		external_id: String,
		#[source]
		source: RegistryError,
	},
}

pub(crate) fn parse(json: &str) -> Result<Vec<RootComponentOperation>, BatchError> {
	Ok(serde_json::from_str(json)?)
}

/// Applies `operations` in order, stopping at the first failure.
pub(crate) async fn apply_all(registry: &mut RootComponentRegistry, operations: Vec<RootComponentOperation>) -> Result<Vec<OperationOutcome>, BatchError> {
	let mut outcomes = Vec::with_capacity(operations.len());
	for (index, operation) in operations.into_iter().enumerate() {
		let kind = operation.kind();
		let external_id = operation.external_id().to_string();
		match operation.apply(registry).await {
			Ok(outcome) => outcomes.push(outcome),
			Err(source) => {
				tracing::warn!(index, kind, external_id = %external_id, error = %source, "session.batch.rejected");
				return Err(BatchError::Operation {
					index,
					kind,
					external_id,
					source,
				});
			}
		}
	}
	Ok(outcomes)
}
