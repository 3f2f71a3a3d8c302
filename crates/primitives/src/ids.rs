use std::fmt;

use serde::{Deserialize, Serialize};

/// Renderer-assigned identifier of one live component instance.
///
/// A root component keeps its external id for its whole lifetime, but its
/// `ComponentId` changes every time the registry replaces the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl ComponentId {
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ComponentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

impl From<u64> for ComponentId {
	fn from(value: u64) -> Self {
		Self(value)
	}
}
