use thiserror::Error;
use weft_components::RegistryError;
use weft_persist::PersistError;
use weft_worker::DispatchError;

use crate::BatchError;

/// Errors returned by [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error(transparent)]
	Persist(#[from] PersistError),

	/// The session dispatcher rejected or lost the work item.
	#[error("session dispatcher: {0}")]
	Dispatch(#[from] DispatchError),

	#[error(transparent)]
	Batch(#[from] BatchError),
}
