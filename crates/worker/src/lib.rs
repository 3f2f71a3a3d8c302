//! Worker primitives for session execution.
//!
//! Every render-affecting operation of a session runs through one
//! [`Dispatcher`]: a single task draining a FIFO queue of work items, so at most
//! one mutation of session state is in flight at a time.

mod class;
pub mod dispatcher;
mod panic;
mod spawn;

pub use class::TaskClass;
pub use dispatcher::{DispatchError, DispatchExit, Dispatcher, DispatcherSpec, ShutdownMode, ShutdownReport};
pub use panic::panic_message;
pub use spawn::spawn;
