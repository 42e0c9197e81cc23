// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider clients. The registry only needs identity and a connectivity
//! probe; request/response protocols live elsewhere.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{LlmRegistryError, LlmRegistryResult};
use crate::types::{ProviderSpec, ProviderType};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait ProviderClient: Send + Sync {
	fn alias(&self) -> &str;

	fn provider_type(&self) -> ProviderType;

	fn model(&self) -> &str;

	/// Issue the smallest request that proves the backend is reachable and
	/// the credentials are accepted. Returns a short status message.
	async fn probe(&self) -> LlmRegistryResult<String>;
}

/// Returns the standard Ratchet User-Agent string.
pub fn user_agent() -> String {
	format!("ratchet/{}", env!("CARGO_PKG_VERSION"))
}

/// Shared HTTP client with the Ratchet User-Agent and probe timeout.
pub fn new_http_client() -> LlmRegistryResult<Client> {
	Client::builder()
		.user_agent(user_agent())
		.timeout(PROBE_TIMEOUT)
		.build()
		.map_err(|e| LlmRegistryError::Client(format!("failed to build HTTP client: {e}")))
}

/// Scripted provider used in development and tests. Never touches the
/// network.
pub struct MockProviderClient {
	alias: String,
	model: String,
}

impl MockProviderClient {
	pub fn new(spec: &ProviderSpec) -> Self {
		Self {
			alias: spec.alias.clone(),
			model: spec.model.clone(),
		}
	}
}

#[async_trait]
impl ProviderClient for MockProviderClient {
	fn alias(&self) -> &str {
		&self.alias
	}

	fn provider_type(&self) -> ProviderType {
		ProviderType::Mock
	}

	fn model(&self) -> &str {
		&self.model
	}

	async fn probe(&self) -> LlmRegistryResult<String> {
		Ok("mock provider ready".to_string())
	}
}

/// HTTP-backed provider (Anthropic, OpenAI-compatible, Ollama).
pub struct HttpProviderClient {
	http: Client,
	spec: ProviderSpec,
}

impl HttpProviderClient {
	pub fn new(http: Client, spec: ProviderSpec) -> Self {
		Self { http, spec }
	}

	fn probe_url(&self) -> String {
		format!(
			"{}{}",
			self.spec.effective_base_url().trim_end_matches('/'),
			self.spec.provider_type.probe_path()
		)
	}
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
	fn alias(&self) -> &str {
		&self.spec.alias
	}

	fn provider_type(&self) -> ProviderType {
		self.spec.provider_type
	}

	fn model(&self) -> &str {
		&self.spec.model
	}

	#[tracing::instrument(skip(self), fields(alias = %self.spec.alias, provider_type = %self.spec.provider_type))]
	async fn probe(&self) -> LlmRegistryResult<String> {
		let mut request = self.http.get(self.probe_url());

		if let Some(key) = self.spec.api_key.as_ref().filter(|k| !k.is_empty()) {
			request = match self.spec.provider_type {
				ProviderType::Anthropic => request
					.header("x-api-key", key.expose())
					.header("anthropic-version", ANTHROPIC_VERSION),
				_ => request.bearer_auth(key.expose()),
			};
		}

		let response = request
			.send()
			.await
			.map_err(|e| LlmRegistryError::Client(format!("request failed: {e}")))?;

		let status = response.status();
		if status.is_success() {
			Ok(format!("{} reachable ({status})", self.spec.provider_type))
		} else {
			Err(LlmRegistryError::Client(format!(
				"{} returned {status}",
				self.spec.provider_type
			)))
		}
	}
}
