// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeSet;

/// Registered by the development vault backend.
pub const VAULT_DEV_SERVICE: &str = "ratchet-vault-dev";

/// Registered by the request rate limiter.
pub const RATE_LIMIT_SERVICE: &str = "ratchet-ratelimit";

/// Lookup of host services by well-known name.
pub trait ServiceRegistry: Send + Sync {
	fn is_registered(&self, name: &str) -> bool;
}

/// Fixed set of service names, built at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticServiceRegistry {
	names: BTreeSet<String>,
}

impl StaticServiceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, name: impl Into<String>) -> Self {
		self.names.insert(name.into());
		self
	}

	pub fn register(&mut self, name: impl Into<String>) {
		self.names.insert(name.into());
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.names.iter().map(String::as_str)
	}
}

impl ServiceRegistry for StaticServiceRegistry {
	fn is_registered(&self, name: &str) -> bool {
		self.names.contains(name)
	}
}

impl<S: Into<String>> FromIterator<S> for StaticServiceRegistry {
	fn from_iter<I: IntoIterator<Item = S>>(names: I) -> Self {
		Self {
			names: names.into_iter().map(Into::into).collect(),
		}
	}
}
