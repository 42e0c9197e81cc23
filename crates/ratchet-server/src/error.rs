// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ratchet_common_config::ConfigError;
use ratchet_server_db::DbError;
use ratchet_server_llm_registry::LlmRegistryError;
use ratchet_server_secrets::SecretsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("database error: {0}")]
	Database(#[from] DbError),

	#[error("secrets error: {0}")]
	Secrets(#[from] SecretsError),

	#[error("provider registry error: {0}")]
	Registry(#[from] LlmRegistryError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum WebhookError {
	#[error("unknown webhook: {0}")]
	UnknownWebhook(String),

	#[error("webhook '{name}' has invalid source '{source_name}'")]
	InvalidSource { name: String, source_name: String },

	#[error("malformed webhook payload: {0}")]
	MalformedPayload(#[from] serde_json::Error),

	#[error("webhook store error: {0}")]
	Store(#[from] DbError),

	#[error("webhook secret error: {0}")]
	Secrets(#[from] SecretsError),
}

pub type WebhookResult<T> = Result<T, WebhookError>;
