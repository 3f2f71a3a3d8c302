use std::sync::Arc;
use std::time::Duration;

use super::*;

#[derive(Default)]
struct Journal {
	entries: Vec<usize>,
	in_flight: bool,
}

fn spawn_journal() -> Dispatcher<Journal> {
	Dispatcher::spawn(DispatcherSpec::new("journal", TaskClass::Interactive).capacity(4), Journal::default())
}

#[tokio::test]
async fn invoke_returns_work_result() {
	let dispatcher = spawn_journal();
	let len = dispatcher
		.invoke(|journal| {
			Box::pin(async move {
				journal.entries.push(1);
				journal.entries.len()
			})
		})
		.await;
	assert_eq!(len, Ok(1));
}

#[tokio::test]
async fn work_items_run_in_submission_order_without_overlap() {
	let dispatcher = Dispatcher::spawn(DispatcherSpec::new("journal", TaskClass::Interactive).capacity(32), Journal::default());

	// Every item is enqueued before the first one runs; join_all polls them
	// in index order, so index order is submission order.
	let submissions = (0..24).map(|i| {
		dispatcher.invoke(move |journal: &mut Journal| {
			Box::pin(async move {
				assert!(!journal.in_flight, "work items overlapped");
				journal.in_flight = true;
				tokio::task::yield_now().await;
				journal.entries.push(i);
				journal.in_flight = false;
			})
		})
	});
	let results = futures::future::join_all(submissions).await;
	assert!(results.iter().all(Result::is_ok));

	let entries = dispatcher.invoke(|journal| Box::pin(async move { journal.entries.clone() })).await.unwrap();
	assert_eq!(entries, (0..24).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submitters_never_overlap() {
	let dispatcher = Arc::new(spawn_journal());
	let mut handles = Vec::new();
	for i in 0..16 {
		let dispatcher = Arc::clone(&dispatcher);
		handles.push(crate::spawn(TaskClass::Background, async move {
			dispatcher
				.invoke(move |journal| {
					Box::pin(async move {
						assert!(!journal.in_flight, "work items overlapped");
						journal.in_flight = true;
						tokio::time::sleep(Duration::from_millis(1)).await;
						journal.entries.push(i);
						journal.in_flight = false;
					})
				})
				.await
		}));
	}
	for handle in handles {
		assert_eq!(handle.await.unwrap(), Ok(()));
	}

	let mut entries = dispatcher.invoke(|journal| Box::pin(async move { journal.entries.clone() })).await.unwrap();
	entries.sort_unstable();
	assert_eq!(entries, (0..16).collect::<Vec<_>>());
}

#[tokio::test]
async fn panicking_work_is_isolated() {
	let dispatcher = spawn_journal();
	let res: Result<(), _> = dispatcher.invoke(|_journal| Box::pin(async move { panic!("bad work item") })).await;
	assert_eq!(res, Err(DispatchError::Panicked("bad work item".to_string())));

	let after = dispatcher
		.invoke(|journal| {
			Box::pin(async move {
				journal.entries.push(5);
				journal.entries.len()
			})
		})
		.await;
	assert_eq!(after, Ok(1), "dispatcher should keep running after a panic");
}

#[tokio::test]
async fn graceful_shutdown_drains_queued_work() {
	let dispatcher = Arc::new(spawn_journal());
	let (started_tx, started_rx) = tokio::sync::oneshot::channel();
	let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();

	let first = {
		let dispatcher = Arc::clone(&dispatcher);
		crate::spawn(TaskClass::Background, async move {
			dispatcher
				.invoke(move |journal| {
					Box::pin(async move {
						let _ = started_tx.send(());
						let _ = gate_rx.await;
						journal.entries.push(1);
					})
				})
				.await
		})
	};
	started_rx.await.unwrap();

	let second = {
		let dispatcher = Arc::clone(&dispatcher);
		crate::spawn(TaskClass::Background, async move {
			dispatcher.invoke(|journal| Box::pin(async move { journal.entries.push(2) })).await
		})
	};
	while dispatcher.pending() == 0 {
		tokio::task::yield_now().await;
	}

	let _ = gate_tx.send(());
	let report = dispatcher
		.shutdown(ShutdownMode::Graceful {
			timeout: Duration::from_secs(1),
		})
		.await;
	assert!(report.completed());
	assert!(!report.timed_out());
	assert_eq!(report.processed(), 2);
	assert_eq!(first.await.unwrap(), Ok(()));
	assert_eq!(second.await.unwrap(), Ok(()));

	let res = dispatcher.invoke(|_journal| Box::pin(async move {})).await;
	assert_eq!(res, Err(DispatchError::Closed));
}

#[tokio::test]
async fn immediate_shutdown_abandons_hung_work() {
	let dispatcher = Arc::new(spawn_journal());
	let (started_tx, started_rx) = tokio::sync::oneshot::channel();

	let hung = {
		let dispatcher = Arc::clone(&dispatcher);
		crate::spawn(TaskClass::Background, async move {
			dispatcher
				.invoke(move |_journal| {
					Box::pin(async move {
						let _ = started_tx.send(());
						std::future::pending::<()>().await
					})
				})
				.await
		})
	};
	started_rx.await.unwrap();

	let report = tokio::time::timeout(Duration::from_millis(500), dispatcher.shutdown(ShutdownMode::Immediate))
		.await
		.expect("shutdown should not hang");
	assert_eq!(report.exit(), Some(DispatchExit::Cancelled));
	assert_eq!(hung.await.unwrap(), Err(DispatchError::Abandoned));
}

#[tokio::test]
async fn second_shutdown_is_a_no_op() {
	let dispatcher = spawn_journal();
	let first = dispatcher.shutdown(ShutdownMode::Immediate).await;
	assert!(first.exit().is_some());
	let second = dispatcher.shutdown(ShutdownMode::Immediate).await;
	assert!(second.exit().is_none());
	assert!(dispatcher.is_closed());
}
