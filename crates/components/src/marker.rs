//! Boundary marker keys.
//!
//! A client presents a marker key with every root component request. The key
//! has the shape `<location-hash>:<component-key>`: the location hash names
//! where the component was rendered, and the optional component key is set
//! only when the component declared its own key. Only components with a key
//! may receive new parameters in place; everything else is replaced.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Parsed boundary marker key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey {
	location_hash: String,
	component_key: String,
}

/// Error returned by [`MarkerKey::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed boundary marker key")]
pub struct InvalidMarkerKey;

impl MarkerKey {
	/// Parses a raw client-supplied key.
	///
	/// Returns `None` for malformed input; never panics.
	pub fn parse(raw: &str) -> Option<Self> {
		let (location_hash, component_key) = raw.split_once(':')?;
		if location_hash.is_empty() || !location_hash.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
			return None;
		}
		Some(Self {
			location_hash: location_hash.to_string(),
			component_key: component_key.to_string(),
		})
	}

	pub fn location_hash(&self) -> &str {
		&self.location_hash
	}

	/// Component-declared key, if any.
	pub fn component_key(&self) -> Option<&str> {
		(!self.component_key.is_empty()).then_some(self.component_key.as_str())
	}

	/// Whether the component opted into receiving new parameters in place.
	pub fn has_component_key(&self) -> bool {
		!self.component_key.is_empty()
	}
}

impl FromStr for MarkerKey {
	type Err = InvalidMarkerKey;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s).ok_or(InvalidMarkerKey)
	}
}

impl fmt::Display for MarkerKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.location_hash, self.component_key)
	}
}
