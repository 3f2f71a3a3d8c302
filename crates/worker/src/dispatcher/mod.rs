use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use weft_primitives::BoxFutureSend;

use crate::{TaskClass, panic_message};

/// Default work queue capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// One queued work item. Receives exclusive access to the dispatcher state.
type Job<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFutureSend<'a, ()> + Send>;

fn job<S, F>(f: F) -> Job<S>
where
	F: for<'a> FnOnce(&'a mut S) -> BoxFutureSend<'a, ()> + Send + 'static,
{
	Box::new(f)
}

/// Error returned by [`Dispatcher::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
	/// The dispatcher no longer accepts work.
	Closed,
	/// The work item panicked. The dispatcher keeps running.
	Panicked(String),
	/// The work item was dropped before completing, e.g. by an immediate shutdown.
	Abandoned,
}

impl fmt::Display for DispatchError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Closed => write!(f, "dispatcher closed"),
			Self::Panicked(msg) => write!(f, "dispatched work panicked: {msg}"),
			Self::Abandoned => write!(f, "dispatched work abandoned before completion"),
		}
	}
}

impl std::error::Error for DispatchError {}

/// Why the dispatcher worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
	/// Queue closed and every queued item ran.
	Drained,
	/// Cancelled; queued items were dropped.
	Cancelled,
	/// The worker task itself failed to join.
	JoinFailed,
}

/// Shutdown mode for a dispatcher.
#[derive(Debug, Clone, Copy)]
pub enum ShutdownMode {
	/// Cancel the in-flight item and drop the queue.
	Immediate,
	/// Stop accepting work, run what is queued, cancel if `timeout` elapses.
	Graceful { timeout: Duration },
}

/// Shutdown report for one dispatcher.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
	timed_out: bool,
	exit: Option<DispatchExit>,
	processed: u64,
}

impl ShutdownReport {
	/// Returns `true` when the queue was fully drained.
	pub fn completed(&self) -> bool {
		self.exit == Some(DispatchExit::Drained)
	}

	pub fn timed_out(&self) -> bool {
		self.timed_out
	}

	/// Exit observed by this call, `None` if another caller already joined the worker.
	pub fn exit(&self) -> Option<DispatchExit> {
		self.exit
	}

	/// Work items completed over the dispatcher lifetime.
	pub fn processed(&self) -> u64 {
		self.processed
	}
}

/// Builder spec for one dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherSpec {
	name: String,
	class: TaskClass,
	capacity: usize,
}

impl DispatcherSpec {
	pub fn new(name: impl Into<String>, class: TaskClass) -> Self {
		Self {
			name: name.into(),
			class,
			capacity: DEFAULT_QUEUE_CAPACITY,
		}
	}

	/// Sets the work queue capacity. Submitters wait for room when it is full.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	#[must_use]
	pub fn capacity(mut self, capacity: usize) -> Self {
		assert!(capacity > 0, "dispatcher capacity must be > 0");
		self.capacity = capacity;
		self
	}
}

/// Serialized execution context owning a piece of state `S`.
///
/// Work items run one at a time, strictly in submission order, each with
/// `&mut S`. The state never leaves the worker task, so every mutation of it
/// is serialized by construction.
pub struct Dispatcher<S> {
	name: Arc<str>,
	tx: mpsc::Sender<Job<S>>,
	close: CancellationToken,
	cancel: CancellationToken,
	processed: Arc<AtomicU64>,
	worker: Mutex<Option<JoinHandle<DispatchExit>>>,
}

impl<S> Drop for Dispatcher<S> {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

impl<S> Dispatcher<S>
where
	S: Send + 'static,
{
	/// Moves `state` into a new worker task and returns its dispatcher.
	///
	/// # Panics
	///
	/// Panics when called outside a Tokio runtime.
	pub fn spawn(spec: DispatcherSpec, state: S) -> Self {
		let (tx, rx) = mpsc::channel(spec.capacity);
		let name: Arc<str> = spec.name.into();
		let close = CancellationToken::new();
		let cancel = CancellationToken::new();
		let processed = Arc::new(AtomicU64::new(0));

		let worker = crate::spawn(
			spec.class,
			run_dispatcher(Arc::clone(&name), state, rx, close.clone(), cancel.clone(), Arc::clone(&processed)),
		);

		Self {
			name,
			tx,
			close,
			cancel,
			processed,
			worker: Mutex::new(Some(worker)),
		}
	}

	/// Dispatcher name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Number of work items completed so far.
	pub fn processed(&self) -> u64 {
		self.processed.load(Ordering::Acquire)
	}

	/// Number of work items waiting in the queue.
	pub fn pending(&self) -> usize {
		self.tx.max_capacity() - self.tx.capacity()
	}

	/// Returns `true` once the dispatcher stopped accepting work.
	pub fn is_closed(&self) -> bool {
		self.tx.is_closed() || self.close.is_cancelled() || self.cancel.is_cancelled()
	}

	/// Runs `work` on the dispatcher and waits for its result.
	///
	/// Items submitted by one caller run in the order they were submitted,
	/// and never overlap with any other item.
	pub async fn invoke<T, F>(&self, work: F) -> Result<T, DispatchError>
	where
		F: for<'a> FnOnce(&'a mut S) -> BoxFutureSend<'a, T> + Send + 'static,
		T: Send + 'static,
	{
		if self.is_closed() {
			return Err(DispatchError::Closed);
		}

		let (reply_tx, reply_rx) = oneshot::channel();
		let name = Arc::clone(&self.name);
		let item = job(move |state: &mut S| {
			Box::pin(async move {
				let outcome = AssertUnwindSafe(async move { work(state).await }).catch_unwind().await;
				let reply = outcome.map_err(|payload| {
					let message = panic_message(payload.as_ref());
					tracing::error!(dispatcher = %name, %message, "worker.dispatch.panicked");
					DispatchError::Panicked(message)
				});
				let _ = reply_tx.send(reply);
			})
		});

		self.tx.send(item).await.map_err(|_| DispatchError::Closed)?;
		tracing::trace!(dispatcher = %self.name, pending = self.pending(), "worker.dispatch.enqueue");

		match reply_rx.await {
			Ok(reply) => reply,
			Err(_) => Err(DispatchError::Abandoned),
		}
	}

	/// Shuts down the dispatcher.
	pub async fn shutdown(&self, mode: ShutdownMode) -> ShutdownReport {
		let Some(mut worker) = self.worker.lock().await.take() else {
			return ShutdownReport {
				timed_out: false,
				exit: None,
				processed: self.processed(),
			};
		};

		let (exit, timed_out) = match mode {
			ShutdownMode::Immediate => {
				self.cancel.cancel();
				(join_exit(worker.await), false)
			}
			ShutdownMode::Graceful { timeout } => {
				self.close.cancel();
				match tokio::time::timeout(timeout, &mut worker).await {
					Ok(res) => (join_exit(res), false),
					Err(_) => {
						tracing::warn!(dispatcher = %self.name, ?timeout, "graceful shutdown timed out; cancelling");
						self.cancel.cancel();
						(join_exit(worker.await), true)
					}
				}
			}
		};

		tracing::debug!(dispatcher = %self.name, ?exit, processed = self.processed(), "worker.dispatch.shutdown");
		ShutdownReport {
			timed_out,
			exit: Some(exit),
			processed: self.processed(),
		}
	}
}

fn join_exit(res: Result<DispatchExit, tokio::task::JoinError>) -> DispatchExit {
	res.unwrap_or(DispatchExit::JoinFailed)
}

async fn run_dispatcher<S>(
	name: Arc<str>,
	mut state: S,
	mut rx: mpsc::Receiver<Job<S>>,
	close: CancellationToken,
	cancel: CancellationToken,
	processed: Arc<AtomicU64>,
) -> DispatchExit
where
	S: Send + 'static,
{
	let mut closing = false;
	let exit = loop {
		let item = tokio::select! {
			biased;
			_ = cancel.cancelled() => break DispatchExit::Cancelled,
			_ = close.cancelled(), if !closing => {
				// Refuse new items but keep draining what is already queued.
				closing = true;
				rx.close();
				continue;
			}
			item = rx.recv() => {
				let Some(item) = item else {
					break DispatchExit::Drained;
				};
				item
			}
		};

		// Cancel-aware run: an immediate shutdown preempts a hung item.
		tokio::select! {
			biased;
			_ = cancel.cancelled() => break DispatchExit::Cancelled,
			_ = item(&mut state) => {}
		}
		processed.fetch_add(1, Ordering::AcqRel);
	};

	tracing::debug!(dispatcher = %name, ?exit, "worker.dispatch.exit");
	exit
}

#[cfg(test)]
mod tests;
