use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// A pinned, boxed future that is required to be Send.
pub type BoxFutureSend<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pinned, boxed future that is required to be Send and 'static.
pub type BoxFutureStatic<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Polls a future once without registering for wakeups.
///
/// Returns `None` if the future is still pending. The future stays usable, so
/// callers can poll it again later with a real waker.
pub fn poll_once<F: Future + Unpin>(fut: &mut F) -> Option<F::Output> {
	let mut cx = Context::from_waker(Waker::noop());
	match Pin::new(fut).poll(&mut cx) {
		Poll::Ready(res) => Some(res),
		Poll::Pending => None,
	}
}
