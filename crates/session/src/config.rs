//! Session configuration loaded from TOML.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use weft_primitives::RenderMode;

/// Errors that can occur when loading a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid value for {field}: {reason}")]
	Invalid { field: &'static str, reason: &'static str },
}

/// Settings for one session.
///
/// Every table and field is optional; missing values take the defaults below.
///
/// ```toml
/// mode = "server"
///
/// [root_components]
/// max_interactive = 1000
///
/// [dispatcher]
/// queue_capacity = 128
/// shutdown_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
	pub mode: RenderMode,
	pub root_components: RootComponentsConfig,
	pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootComponentsConfig {
	/// Cap on live root components, enforced only in [`RenderMode::Server`]
	/// and [`RenderMode::Auto`] sessions.
	pub max_interactive: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
	pub queue_capacity: usize,
	pub shutdown_timeout_ms: u64,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			mode: RenderMode::Server,
			root_components: RootComponentsConfig::default(),
			dispatcher: DispatcherConfig::default(),
		}
	}
}

impl Default for RootComponentsConfig {
	fn default() -> Self {
		Self { max_interactive: 1000 }
	}
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			queue_capacity: 128,
			shutdown_timeout_ms: 5000,
		}
	}
}

impl SessionConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		if config.dispatcher.queue_capacity == 0 {
			return Err(ConfigError::Invalid {
				field: "dispatcher.queue_capacity",
				reason: "must be greater than zero",
			});
		}
		Ok(config)
	}

	/// Root component cap for this session's mode, `None` when unbounded.
	pub fn root_component_limit(&self) -> Option<usize> {
		match self.mode {
			RenderMode::Server | RenderMode::Auto => Some(self.root_components.max_interactive),
			RenderMode::Static | RenderMode::WebAssembly => None,
		}
	}

	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_millis(self.dispatcher.shutdown_timeout_ms)
	}
}
