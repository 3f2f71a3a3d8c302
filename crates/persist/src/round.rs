//! One pause round: invoke every compatible callback and wait for all of them.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use weft_primitives::poll_once;
use weft_worker::panic_message;

use crate::PersistCallback;

/// Diagnostic code attached to every logged callback failure.
pub const CALLBACK_FAILURE_CODE: u32 = 1000;

/// Counts for one pause round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
	pub invoked: usize,
	pub succeeded: usize,
	pub failed: usize,
}

impl RoundReport {
	fn record(&mut self, succeeded: bool) {
		if succeeded {
			self.succeeded += 1;
		} else {
			self.failed += 1;
		}
	}
}

type Settled = Result<anyhow::Result<()>, Box<dyn Any + Send>>;

/// Logs a failed or panicked callback and reports whether it succeeded.
fn settle(result: Settled) -> bool {
	match result {
		Ok(Ok(())) => true,
		Ok(Err(err)) => {
			tracing::error!(code = CALLBACK_FAILURE_CODE, error = %format!("{err:#}"), "persist.callback_failed");
			false
		}
		Err(payload) => {
			tracing::error!(code = CALLBACK_FAILURE_CODE, panic = %panic_message(&*payload), "persist.callback_failed");
			false
		}
	}
}

/// Runs every callback once. Never fails; failures are logged and counted.
///
/// Callbacks that finish on their first poll settle immediately. The rest are
/// awaited together, in whatever order they complete.
pub(crate) async fn run_pause_round(callbacks: Vec<PersistCallback>) -> RoundReport {
	let mut report = RoundReport::default();
	let mut pending = FuturesUnordered::new();

	for callback in callbacks {
		report.invoked += 1;
		let mut fut = match catch_unwind(AssertUnwindSafe(|| callback())) {
			Ok(fut) => AssertUnwindSafe(fut).catch_unwind(),
			Err(payload) => {
				report.record(settle(Err(payload)));
				continue;
			}
		};
		match poll_once(&mut fut) {
			Some(result) => report.record(settle(result)),
			None => pending.push(fut.map(settle)),
		}
	}

	let suspended = pending.len();
	while let Some(succeeded) = pending.next().await {
		report.record(succeeded);
	}

	tracing::debug!(
		invoked = report.invoked,
		suspended,
		failed = report.failed,
		"persist.round"
	);
	report
}
