// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Detection of secret-shaped substrings in free text.

use std::sync::LazyLock;

use regex::Regex;

use crate::finding::AuditSeverity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecretPattern {
	PrivateKey,
	AwsAccessKey,
	GithubToken,
	SlackToken,
	AnthropicKey,
	OpenAiKey,
	BearerToken,
	PasswordAssignment,
}

impl SecretPattern {
	pub fn label(&self) -> &'static str {
		match self {
			SecretPattern::PrivateKey => "private key",
			SecretPattern::AwsAccessKey => "AWS access key",
			SecretPattern::GithubToken => "GitHub token",
			SecretPattern::SlackToken => "Slack token",
			SecretPattern::AnthropicKey => "Anthropic API key",
			SecretPattern::OpenAiKey => "OpenAI API key",
			SecretPattern::BearerToken => "bearer token",
			SecretPattern::PasswordAssignment => "password or key assignment",
		}
	}

	pub fn severity(&self) -> AuditSeverity {
		match self {
			SecretPattern::PrivateKey => AuditSeverity::Critical,
			SecretPattern::AwsAccessKey
			| SecretPattern::GithubToken
			| SecretPattern::SlackToken
			| SecretPattern::AnthropicKey
			| SecretPattern::OpenAiKey => AuditSeverity::High,
			SecretPattern::BearerToken | SecretPattern::PasswordAssignment => AuditSeverity::Medium,
		}
	}
}

static PATTERNS: LazyLock<Vec<(SecretPattern, Regex)>> = LazyLock::new(|| {
	[
		(
			SecretPattern::PrivateKey,
			r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |ENCRYPTED )?PRIVATE KEY-----",
		),
		(SecretPattern::AwsAccessKey, r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b"),
		(
			SecretPattern::GithubToken,
			r"\b(?:gh[pousr]_[A-Za-z0-9]{36}|github_pat_[A-Za-z0-9_]{22,})",
		),
		(SecretPattern::SlackToken, r"\bxox[abprs]-[A-Za-z0-9-]{10,}"),
		(SecretPattern::AnthropicKey, r"\bsk-ant-[A-Za-z0-9_-]{20,}"),
		(
			SecretPattern::OpenAiKey,
			r"\bsk-(?:proj-[A-Za-z0-9_-]{20,}|[A-Za-z0-9]{20,})",
		),
		(SecretPattern::BearerToken, r"(?i)\bbearer\s+[A-Za-z0-9._~+/-]{20,}=*"),
		(
			SecretPattern::PasswordAssignment,
			r#"(?i)\b(?:password|passwd|secret|api[_-]?key)\s*[:=]\s*["']?[^\s"']{8,}"#,
		),
	]
	.into_iter()
	.filter_map(|(kind, source)| match Regex::new(source) {
		Ok(re) => Some((kind, re)),
		Err(e) => {
			tracing::error!(pattern = ?kind, error = %e, "invalid secret pattern");
			None
		}
	})
	.collect()
});

/// Every pattern kind present in `text`, each reported once, in a stable order.
pub fn detect(text: &str) -> Vec<SecretPattern> {
	PATTERNS
		.iter()
		.filter(|(_, re)| re.is_match(text))
		.map(|(kind, _)| *kind)
		.collect()
}
