// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ratchet_common_config::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::LlmRegistryError;

/// Backends a provider row can name in its `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
	Mock,
	Anthropic,
	OpenAi,
	OpenRouter,
	Ollama,
}

impl ProviderType {
	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderType::Mock => "mock",
			ProviderType::Anthropic => "anthropic",
			ProviderType::OpenAi => "openai",
			ProviderType::OpenRouter => "openrouter",
			ProviderType::Ollama => "ollama",
		}
	}

	/// Local and scripted backends run without an API key.
	pub fn accepts_missing_credentials(&self) -> bool {
		matches!(self, ProviderType::Mock | ProviderType::Ollama)
	}

	pub fn default_base_url(&self) -> &'static str {
		match self {
			ProviderType::Mock => "",
			ProviderType::Anthropic => "https://api.anthropic.com/v1",
			ProviderType::OpenAi => "https://api.openai.com/v1",
			ProviderType::OpenRouter => "https://openrouter.ai/api/v1",
			ProviderType::Ollama => "http://localhost:11434",
		}
	}

	/// Path of the cheapest authenticated request the backend offers.
	pub fn probe_path(&self) -> &'static str {
		match self {
			ProviderType::Ollama => "/api/tags",
			_ => "/models",
		}
	}
}

impl fmt::Display for ProviderType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProviderType {
	type Err = LlmRegistryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"mock" => Ok(ProviderType::Mock),
			"anthropic" => Ok(ProviderType::Anthropic),
			"openai" => Ok(ProviderType::OpenAi),
			"openrouter" => Ok(ProviderType::OpenRouter),
			"ollama" => Ok(ProviderType::Ollama),
			_ => Err(LlmRegistryError::UnknownType(s.to_string())),
		}
	}
}

/// Everything a factory needs to build a client.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
	pub alias: String,
	pub provider_type: ProviderType,
	pub model: String,
	pub base_url: String,
	pub max_tokens: i64,
	pub api_key: Option<SecretString>,
}

impl ProviderSpec {
	pub fn effective_base_url(&self) -> &str {
		if self.base_url.is_empty() {
			self.provider_type.default_base_url()
		} else {
			&self.base_url
		}
	}
}

/// Outcome of [`ProviderRegistry::test_connection`](crate::ProviderRegistry::test_connection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResult {
	pub ok: bool,
	pub message: String,
	#[serde(with = "duration_millis")]
	pub latency: Duration,
}

mod duration_millis {
	use serde::Serializer;
	use std::time::Duration;

	pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
		s.serialize_u64(d.as_millis() as u64)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_known_types() {
		assert_eq!("OpenAI".parse::<ProviderType>().unwrap(), ProviderType::OpenAi);
		assert_eq!("ollama".parse::<ProviderType>().unwrap(), ProviderType::Ollama);
		assert!(matches!(
			"gpt-9000".parse::<ProviderType>(),
			Err(LlmRegistryError::UnknownType(_))
		));
	}

	#[test]
	fn credential_requirements() {
		assert!(ProviderType::Mock.accepts_missing_credentials());
		assert!(ProviderType::Ollama.accepts_missing_credentials());
		assert!(!ProviderType::Anthropic.accepts_missing_credentials());
		assert!(!ProviderType::OpenRouter.accepts_missing_credentials());
	}

	#[test]
	fn base_url_override() {
		let mut spec = ProviderSpec {
			alias: "a".to_string(),
			provider_type: ProviderType::OpenAi,
			model: String::new(),
			base_url: String::new(),
			max_tokens: 0,
			api_key: None,
		};
		assert_eq!(spec.effective_base_url(), "https://api.openai.com/v1");
		spec.base_url = "http://proxy.internal/v1".to_string();
		assert_eq!(spec.effective_base_url(), "http://proxy.internal/v1");
	}

	#[test]
	fn connection_result_reports_latency_in_millis() {
		let result = ConnectionTestResult {
			ok: true,
			message: "2 models".to_string(),
			latency: Duration::from_micros(12_900),
		};
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["latency"], 12);
		assert_eq!(json["ok"], true);
	}
}
