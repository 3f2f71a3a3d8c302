//! Tracing setup for hosts embedding a session.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Installs a global stderr subscriber filtered by `RUST_LOG`, falling back
/// to `default_directives`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_directives: &str) -> bool {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
	let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true);

	tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().is_ok()
}
