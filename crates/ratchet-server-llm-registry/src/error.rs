// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ratchet_server_db::DbError;
use ratchet_server_secrets::SecretsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmRegistryError {
	#[error("provider not found: {0}")]
	NotFound(String),

	#[error("no default provider configured")]
	NoDefault,

	#[error("unknown provider type '{0}', expected 'mock', 'anthropic', 'openai', 'openrouter', or 'ollama'")]
	UnknownType(String),

	#[error("provider '{alias}' requires credentials but secret '{secret_name}' is empty or missing")]
	MissingCredentials { alias: String, secret_name: String },

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("secret store error: {0}")]
	Secrets(#[from] SecretsError),

	#[error("provider store error: {0}")]
	Store(#[from] DbError),

	#[error("client error: {0}")]
	Client(String),
}

pub type LlmRegistryResult<T> = Result<T, LlmRegistryError>;
