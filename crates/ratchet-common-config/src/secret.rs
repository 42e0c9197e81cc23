// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting string wrapper for credentials carried through configuration.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// The placeholder printed instead of a secret value.
pub const REDACTED: &str = "[REDACTED]";

/// A string that never prints its contents and is wiped on drop.
///
/// Access requires an explicit [`SecretString::expose`] call so that every
/// read of a credential is visible at the call site.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl serde::Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> serde::Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		String::deserialize(deserializer).map(Self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_and_display_hide_value() {
		let secret = SecretString::new("s.hvs-token");
		assert_eq!(format!("{secret}"), REDACTED);
		assert!(!format!("{secret:?}").contains("s.hvs-token"));
		assert_eq!(secret.expose(), "s.hvs-token");
	}

	#[test]
	fn serializes_as_placeholder() {
		let secret = SecretString::new("hunter2");
		let json = serde_json::to_string(&secret).unwrap();
		assert_eq!(json, format!("\"{REDACTED}\""));
	}

	#[test]
	fn deserializes_plain_value() {
		let secret: SecretString = serde_json::from_str("\"abc\"").unwrap();
		assert_eq!(secret.expose(), "abc");
	}

	proptest! {
		#[test]
		fn display_never_leaks(inner in "[a-zA-Z0-9_.-]{3,40}") {
			prop_assume!(!REDACTED.contains(&inner));
			let secret = SecretString::new(inner.clone());
			let displayed = format!("{secret}");
			let debugged = format!("{secret:?}");
			prop_assert!(!displayed.contains(&inner));
			prop_assert!(!debugged.contains(&inner));
		}
	}
}
