// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Origin of an inbound webhook. Determines the signature scheme and where
/// the event type lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookSource {
	Github,
	Slack,
	Generic,
}

impl WebhookSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			WebhookSource::Github => "github",
			WebhookSource::Slack => "slack",
			WebhookSource::Generic => "generic",
		}
	}

	/// Header carrying the request signature.
	pub fn signature_header(&self) -> &'static str {
		match self {
			WebhookSource::Github => "x-hub-signature-256",
			WebhookSource::Slack => "x-slack-signature",
			WebhookSource::Generic => "x-signature",
		}
	}

	/// Header carrying the signed timestamp, for sources that sign one.
	pub fn timestamp_header(&self) -> Option<&'static str> {
		match self {
			WebhookSource::Slack => Some("x-slack-request-timestamp"),
			WebhookSource::Github | WebhookSource::Generic => None,
		}
	}

	pub(crate) fn signature_prefix(&self) -> &'static str {
		match self {
			WebhookSource::Github | WebhookSource::Generic => "sha256=",
			WebhookSource::Slack => "v0=",
		}
	}
}

impl fmt::Display for WebhookSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Error)]
#[error("unknown webhook source '{0}', expected 'github', 'slack', or 'generic'")]
pub struct UnknownSourceError(pub String);

impl FromStr for WebhookSource {
	type Err = UnknownSourceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"github" => Ok(WebhookSource::Github),
			"slack" => Ok(WebhookSource::Slack),
			"generic" => Ok(WebhookSource::Generic),
			_ => Err(UnknownSourceError(s.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_case_insensitively() {
		assert_eq!("GitHub".parse::<WebhookSource>().unwrap(), WebhookSource::Github);
		assert_eq!("slack".parse::<WebhookSource>().unwrap(), WebhookSource::Slack);
		assert!("gitlab".parse::<WebhookSource>().is_err());
	}

	#[test]
	fn display_roundtrips() {
		for source in [WebhookSource::Github, WebhookSource::Slack, WebhookSource::Generic] {
			assert_eq!(source.to_string().parse::<WebhookSource>().unwrap(), source);
		}
	}
}
