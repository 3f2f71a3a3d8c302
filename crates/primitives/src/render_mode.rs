use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ComponentId;

/// Classification of how and where a component executes.
///
/// Persistence stores declare which modes they accept, so a callback only
/// contributes to the stores that can restore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
	/// Rendered once on the server, no live instance afterwards.
	Static,
	/// Interactive, executing in the server-side session.
	Server,
	/// Interactive, executing in the client.
	WebAssembly,
	/// Interactive, starts on the server and moves to the client when ready.
	Auto,
}

impl RenderMode {
	pub const ALL: [RenderMode; 4] = [Self::Static, Self::Server, Self::WebAssembly, Self::Auto];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Static => "static",
			Self::Server => "server",
			Self::WebAssembly => "web-assembly",
			Self::Auto => "auto",
		}
	}

	/// Returns `true` for modes that keep a live instance after the first render.
	pub const fn is_interactive(self) -> bool {
		!matches!(self, Self::Static)
	}
}

impl fmt::Display for RenderMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Capability to report the current render mode of a live component.
///
/// Returns `None` when `component` does not resolve to a live instance.
pub trait HasRenderMode: Send + Sync {
	fn render_mode_of(&self, component: ComponentId) -> Option<RenderMode>;
}
