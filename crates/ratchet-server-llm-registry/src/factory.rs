// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use reqwest::Client;

use crate::client::{new_http_client, HttpProviderClient, MockProviderClient, ProviderClient};
use crate::error::LlmRegistryResult;
use crate::types::{ProviderSpec, ProviderType};

/// Builds a client for a resolved provider row.
pub trait ClientFactory: Send + Sync {
	fn build(&self, spec: ProviderSpec) -> LlmRegistryResult<Arc<dyn ProviderClient>>;
}

/// Builds mock clients in-process and HTTP clients over one shared
/// connection pool.
pub struct DefaultClientFactory {
	http: Client,
}

impl DefaultClientFactory {
	pub fn new() -> LlmRegistryResult<Self> {
		Ok(Self {
			http: new_http_client()?,
		})
	}

	pub fn with_client(http: Client) -> Self {
		Self { http }
	}
}

impl ClientFactory for DefaultClientFactory {
	fn build(&self, spec: ProviderSpec) -> LlmRegistryResult<Arc<dyn ProviderClient>> {
		match spec.provider_type {
			ProviderType::Mock => Ok(Arc::new(MockProviderClient::new(&spec))),
			ProviderType::Anthropic
			| ProviderType::OpenAi
			| ProviderType::OpenRouter
			| ProviderType::Ollama => Ok(Arc::new(HttpProviderClient::new(self.http.clone(), spec))),
		}
	}
}
