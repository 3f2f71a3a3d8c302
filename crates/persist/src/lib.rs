//! Pause-and-persist coordination of component state.
//!
//! Components register callbacks on a shared [`PersistentComponentState`].
//! Right before the session is torn down or changes render mode, the
//! [`ComponentStatePersistenceManager`] infers each registration's render mode,
//! invokes every callback a store can accept, and commits what they wrote.
//! A later session restores the map and hands each entry out once.

mod blob;
pub mod error;
pub mod manager;
pub mod registration;
mod round;
pub mod state;
pub mod store;

pub use blob::BlobStore;
pub use error::{PersistError, StateError, StoreError};
pub use manager::{ComponentStatePersistenceManager, PersistReport, StoreReport};
pub use registration::{PersistCallback, RegistrationList, RenderModeSource, Subscription};
pub use round::{CALLBACK_FAILURE_CODE, RoundReport};
pub use state::PersistentComponentState;
pub use store::{CompositeStore, MemoryStore, PersistedStateMap, PersistentStateStore};
