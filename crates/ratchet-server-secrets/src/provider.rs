// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use ratchet_common_config::SecretString;

use crate::error::SecretsResult;

/// CRUD over a named-secret store. Names are case-sensitive.
#[async_trait]
pub trait SecretProvider: Send + Sync {
	/// Short identifier for logs and audit findings.
	fn name(&self) -> &str;

	async fn get(&self, name: &str) -> SecretsResult<Option<SecretString>>;

	async fn set(&self, name: &str, value: SecretString) -> SecretsResult<()>;

	/// Fails with [`SecretsError::NotFound`](crate::SecretsError::NotFound)
	/// when `name` does not exist.
	async fn delete(&self, name: &str) -> SecretsResult<()>;

	async fn list(&self) -> SecretsResult<Vec<String>>;
}
