// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use ratchet_common_config::SecretString;

use crate::error::{SecretsError, SecretsResult};
use crate::provider::SecretProvider;

/// Process-local secret store. Contents are lost on exit.
#[derive(Default)]
pub struct MemorySecretProvider {
	secrets: RwLock<BTreeMap<String, SecretString>>,
}

impl MemorySecretProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_secrets<I, K, V>(secrets: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<SecretString>,
	{
		let map = secrets
			.into_iter()
			.map(|(k, v)| (k.into(), v.into()))
			.collect();
		Self {
			secrets: RwLock::new(map),
		}
	}
}

#[async_trait]
impl SecretProvider for MemorySecretProvider {
	fn name(&self) -> &str {
		"memory"
	}

	async fn get(&self, name: &str) -> SecretsResult<Option<SecretString>> {
		Ok(self.secrets.read().get(name).cloned())
	}

	async fn set(&self, name: &str, value: SecretString) -> SecretsResult<()> {
		self.secrets.write().insert(name.to_string(), value);
		Ok(())
	}

	async fn delete(&self, name: &str) -> SecretsResult<()> {
		match self.secrets.write().remove(name) {
			Some(_) => Ok(()),
			None => Err(SecretsError::NotFound(name.to_string())),
		}
	}

	async fn list(&self) -> SecretsResult<Vec<String>> {
		Ok(self.secrets.read().keys().cloned().collect())
	}
}
