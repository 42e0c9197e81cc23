// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-source webhook signature schemes.
//!
//! | Source | Header value | Signed bytes |
//! |--------|--------------|--------------|
//! | github, generic | `sha256=<hex>` | body |
//! | slack | `v0=<hex>` | `v0:<timestamp>:<body>` |

use crate::source::WebhookSource;
use crate::{compute_hmac_sha256, verify_hmac_sha256};

/// Slack rejects requests whose timestamp is more than five minutes old.
pub const DEFAULT_SLACK_TOLERANCE_SECS: i64 = 300;

/// Build Slack's canonical signing string `v0:<timestamp>:<body>`.
pub fn slack_signing_base(timestamp: &str, body: &[u8]) -> Vec<u8> {
	let mut base = Vec::with_capacity(body.len() + timestamp.len() + 4);
	base.extend_from_slice(b"v0:");
	base.extend_from_slice(timestamp.as_bytes());
	base.push(b':');
	base.extend_from_slice(body);
	base
}

/// Produce the signature header value a sender would attach.
///
/// Returns `None` for Slack when no timestamp is given.
pub fn sign(
	source: WebhookSource,
	secret: &str,
	body: &[u8],
	timestamp: Option<&str>,
) -> Option<String> {
	let digest = match source {
		WebhookSource::Github | WebhookSource::Generic => {
			compute_hmac_sha256(secret.as_bytes(), body)
		}
		WebhookSource::Slack => {
			let ts = timestamp.filter(|t| !t.is_empty())?;
			compute_hmac_sha256(secret.as_bytes(), &slack_signing_base(ts, body))
		}
	};
	Some(format!("{}{}", source.signature_prefix(), digest))
}

/// Verify an inbound webhook signature.
///
/// - An empty `secret` means the webhook is unsigned: always accepted.
/// - A non-empty `secret` with an empty `signature` is rejected.
/// - Slack requires `timestamp`; a Slack request without one is rejected.
///
/// The digest comparison is constant time.
pub fn verify_signature(
	source: WebhookSource,
	secret: &str,
	body: &[u8],
	signature: &str,
	timestamp: Option<&str>,
) -> bool {
	if secret.is_empty() {
		return true;
	}
	if signature.is_empty() {
		return false;
	}

	let Some(digest) = signature.strip_prefix(source.signature_prefix()) else {
		return false;
	};

	match source {
		WebhookSource::Github | WebhookSource::Generic => {
			verify_hmac_sha256(secret.as_bytes(), body, digest)
		}
		WebhookSource::Slack => match timestamp.filter(|t| !t.is_empty()) {
			Some(ts) => verify_hmac_sha256(secret.as_bytes(), &slack_signing_base(ts, body), digest),
			None => false,
		},
	}
}

/// Check that a Slack request timestamp (unix seconds) is within
/// `tolerance_secs` of `now_unix`.
pub fn is_fresh_slack_timestamp(timestamp: &str, now_unix: i64, tolerance_secs: i64) -> bool {
	match timestamp.trim().parse::<i64>() {
		Ok(ts) => (now_unix - ts).abs() <= tolerance_secs,
		Err(_) => false,
	}
}
