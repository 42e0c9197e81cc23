// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inbound webhook authentication for Ratchet.
//!
//! - HMAC-SHA256 primitives ([`compute_hmac_sha256`], [`verify_hmac_sha256`])
//! - Per-source signature schemes ([`verify_signature`], [`sign`])
//! - Event type extraction and filtering ([`extract_event_type`], [`matches_filter`])
//!
//! Everything here is pure: no I/O, no clocks except where a timestamp is
//! passed in.

mod event;
mod signature;
mod source;

pub use event::{extract_event_type, matches_filter, WebhookEvent};
pub use signature::{
	is_fresh_slack_timestamp, sign, slack_signing_base, verify_signature,
	DEFAULT_SLACK_TOLERANCE_SECS,
};
pub use source::{UnknownSourceError, WebhookSource};

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute an HMAC-SHA256 signature for a payload.
///
/// Returns the hex-encoded signature without any prefix.
pub fn compute_hmac_sha256(secret: &[u8], payload: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(payload);
	hex::encode(mac.finalize().into_bytes())
}

/// Verify an HMAC-SHA256 signature for a payload in constant time.
///
/// The `signature` should be the raw hex-encoded signature (no prefix).
pub fn verify_hmac_sha256(secret: &[u8], payload: &[u8], signature: &str) -> bool {
	let expected_bytes = match hex::decode(signature) {
		Ok(bytes) => bytes,
		Err(_) => return false,
	};

	let mut mac = match HmacSha256::new_from_slice(secret) {
		Ok(m) => m,
		Err(_) => return false,
	};

	mac.update(payload);
	mac.verify_slice(&expected_bytes).is_ok()
}
