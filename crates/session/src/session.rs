use std::sync::Arc;

use weft_components::{RootComponentRegistry, Renderer, UpdateOutcome};
use weft_persist::{ComponentStatePersistenceManager, PersistReport, PersistentComponentState, PersistentStateStore};
use weft_primitives::{ComponentId, ComponentType, Parameters, RenderMode};
use weft_worker::{Dispatcher, DispatcherSpec, ShutdownMode, ShutdownReport, TaskClass};

use crate::{OperationOutcome, SessionConfig, SessionError, batch};

/// State owned by the session dispatcher.
struct SessionState {
	registry: RootComponentRegistry,
	persistence: ComponentStatePersistenceManager,
}

/// One client session.
///
/// Operations are queued on the session dispatcher and run one at a time in
/// submission order. Must be created inside a tokio runtime.
pub struct Session {
	dispatcher: Dispatcher<SessionState>,
	state: PersistentComponentState,
	config: SessionConfig,
}

impl Session {
	pub fn new(config: SessionConfig, renderer: Arc<dyn Renderer>) -> Self {
		let persistence = ComponentStatePersistenceManager::new();
		let state = persistence.state().clone();
		let registry = RootComponentRegistry::new(renderer, config.root_component_limit());

		let spec = DispatcherSpec::new(format!("session.{}", config.mode), TaskClass::Interactive).capacity(config.dispatcher.queue_capacity.max(1));
		let dispatcher = Dispatcher::spawn(spec, SessionState { registry, persistence });
		tracing::info!(mode = %config.mode, limit = ?config.root_component_limit(), "session.start");

		Self { dispatcher, state, config }
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	pub fn mode(&self) -> RenderMode {
		self.config.mode
	}

	/// Handle components use to register persisting callbacks and read restored state.
	pub fn state(&self) -> &PersistentComponentState {
		&self.state
	}

	pub async fn add_root_component(
		&self,
		external_id: impl Into<String>,
		component_type: ComponentType,
		parameters: Parameters,
		key: impl Into<String>,
	) -> Result<ComponentId, SessionError> {
		let external_id = external_id.into();
		let key = key.into();
		let added = self
			.dispatcher
			.invoke(move |state| Box::pin(async move { state.registry.add(external_id, component_type, parameters, key).await }))
			.await??;
		Ok(added)
	}

	pub async fn update_root_component(&self, external_id: impl Into<String>, parameters: Parameters, key: impl Into<String>) -> Result<UpdateOutcome, SessionError> {
		let external_id = external_id.into();
		let key = key.into();
		let outcome = self
			.dispatcher
			.invoke(move |state| Box::pin(async move { state.registry.update(&external_id, parameters, &key).await }))
			.await??;
		Ok(outcome)
	}

	/// Detaches a root component. Returns the id it had.
	pub async fn remove_root_component(&self, external_id: impl Into<String>) -> Result<ComponentId, SessionError> {
		let external_id = external_id.into();
		let removed = self
			.dispatcher
			.invoke(move |state| Box::pin(async move { state.registry.remove(&external_id).map(|handle| handle.interactive_id()) }))
			.await??;
		Ok(removed)
	}

	/// Applies a JSON array of operations as one work item.
	///
	/// Stops at the first failing operation; earlier operations stay applied.
	pub async fn apply_batch(&self, json: &str) -> Result<Vec<OperationOutcome>, SessionError> {
		let operations = batch::parse(json).inspect_err(|err| {
			tracing::warn!(error = %err, "session.batch.malformed");
		})?;
		let count = operations.len();
		let outcomes = self
			.dispatcher
			.invoke(move |state| Box::pin(async move { batch::apply_all(&mut state.registry, operations).await }))
			.await??;
		tracing::debug!(count, "session.batch.applied");
		Ok(outcomes)
	}

	pub async fn root_component_count(&self) -> Result<usize, SessionError> {
		Ok(self.dispatcher.invoke(|state| Box::pin(async move { state.registry.len() })).await?)
	}

	/// Current id of a root component, if attached.
	pub async fn component_id(&self, external_id: impl Into<String>) -> Result<Option<ComponentId>, SessionError> {
		let external_id = external_id.into();
		let id = self
			.dispatcher
			.invoke(move |state| Box::pin(async move { state.registry.get(&external_id).map(|handle| handle.interactive_id()) }))
			.await?;
		Ok(id)
	}

	/// Loads state persisted by an earlier session into [`Session::state`].
	pub async fn restore_state(&self, store: Arc<dyn PersistentStateStore>) -> Result<usize, SessionError> {
		let restored = self
			.dispatcher
			.invoke(move |state| Box::pin(async move { state.persistence.restore_state(store.as_ref()).await }))
			.await??;
		Ok(restored)
	}

	/// Runs the persistence cycle. Render modes of owner-bound registrations
	/// are resolved through the session renderer.
	pub async fn persist_state(&self, store: Arc<dyn PersistentStateStore>) -> Result<PersistReport, SessionError> {
		let report = self
			.dispatcher
			.invoke(move |state| {
				Box::pin(async move {
					let renderer = Arc::clone(state.registry.renderer());
					state.persistence.persist_state(store.as_ref(), renderer.as_ref()).await
				})
			})
			.await??;
		Ok(report)
	}

	/// Detaches every root component, then drains the queue and stops the dispatcher.
	///
	/// Work already queued still runs. Later calls return [`SessionError::Dispatch`].
	pub async fn close(&self) -> ShutdownReport {
		match self.dispatcher.invoke(|state| Box::pin(async move { state.registry.clear() })).await {
			Ok(cleared) => tracing::debug!(cleared, "session.clear"),
			Err(err) => tracing::warn!(error = %err, "session.clear_failed"),
		}

		let timeout = self.config.shutdown_timeout();
		let report = self.dispatcher.shutdown(ShutdownMode::Graceful { timeout }).await;
		tracing::info!(
			processed = report.processed(),
			timed_out = report.timed_out(),
			"session.closed"
		);
		report
	}
}
