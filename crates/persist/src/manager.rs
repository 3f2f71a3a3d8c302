//! Persistence coordinator.

use weft_primitives::HasRenderMode;

use crate::round::run_pause_round;
use crate::{PersistError, PersistentComponentState, PersistentStateStore, RoundReport};

/// Outcome of one pause round and commit against a single store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreReport {
	pub round: RoundReport,
	/// Entries committed to the store.
	pub entries: usize,
}

/// Outcome of a whole persistence cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
	/// Registrations whose render mode was inferred from their owner.
	pub inferred: usize,
	/// One report per committed store, in commit order.
	pub stores: Vec<StoreReport>,
}

impl PersistReport {
	pub fn failed(&self) -> usize {
		self.stores.iter().map(|store| store.round.failed).sum()
	}
}

/// Drives restore and persist for one session.
///
/// Both operations run at most once per manager.
#[derive(Debug, Default)]
pub struct ComponentStatePersistenceManager {
	state: PersistentComponentState,
	persisted: bool,
	restored: bool,
}

impl ComponentStatePersistenceManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_state(state: PersistentComponentState) -> Self {
		Self {
			state,
			persisted: false,
			restored: false,
		}
	}

	pub fn state(&self) -> &PersistentComponentState {
		&self.state
	}

	pub fn is_persisted(&self) -> bool {
		self.persisted
	}

	/// Loads state persisted by an earlier session. Returns the entry count.
	///
	/// A failed load leaves the manager free to retry.
	pub async fn restore_state(&mut self, store: &dyn PersistentStateStore) -> Result<usize, PersistError> {
		if self.restored {
			return Err(PersistError::AlreadyRestored);
		}
		let state = store.persisted_state().await?;
		self.restored = true;

		let entries = state.len();
		self.state.initialize_restored(state);
		tracing::info!(entries, "persist.restore");
		Ok(entries)
	}

	/// Runs the persistence cycle against `store`.
	///
	/// Render modes are inferred before any callback runs. A registration that
	/// cannot be resolved aborts the cycle with [`PersistError::Configuration`]
	/// and nothing is committed. A store whose [`sub_stores`] is `Some` gets one
	/// round and one commit per sub-store, each starting from an empty map.
	///
	/// The cycle counts as done only once every commit succeeded. After a
	/// [`PersistError::Store`] the whole cycle, callbacks included, may run
	/// again; sub-stores committed before the failure are simply overwritten.
	///
	/// [`sub_stores`]: PersistentStateStore::sub_stores
	pub async fn persist_state(&mut self, store: &dyn PersistentStateStore, lookup: &dyn HasRenderMode) -> Result<PersistReport, PersistError> {
		if self.persisted {
			return Err(PersistError::AlreadyPersisted);
		}

		let inferred = self.state.registrations().infer_render_modes(lookup).inspect_err(|err| {
			tracing::error!(error = %err, "persist.infer_failed");
		})?;

		let mut report = PersistReport {
			inferred,
			stores: Vec::new(),
		};
		match store.sub_stores() {
			Some(stores) => {
				for sub_store in stores {
					report.stores.push(self.persist_into(sub_store.as_ref()).await?);
				}
			}
			None => report.stores.push(self.persist_into(store).await?),
		}
		self.persisted = true;

		tracing::info!(
			inferred = report.inferred,
			stores = report.stores.len(),
			failed = report.failed(),
			"persist.done"
		);
		Ok(report)
	}

	async fn persist_into(&self, store: &dyn PersistentStateStore) -> Result<StoreReport, PersistError> {
		let callbacks = self.state.registrations().compatible(|mode| store.supports_render_mode(mode));

		let scope = self.state.begin_persisting();
		let round = run_pause_round(callbacks).await;
		let state = scope.finish();

		let entries = state.len();
		store.persist_state(state).await.inspect_err(|err| {
			tracing::error!(error = %err, entries, "persist.commit_failed");
		})?;
		tracing::debug!(entries, invoked = round.invoked, "persist.commit");
		Ok(StoreReport { round, entries })
	}
}
