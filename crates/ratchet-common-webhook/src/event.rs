// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

use crate::source::WebhookSource;

const GITHUB_EVENT_HEADER: &str = "x-github-event";

/// Normalised description of an accepted inbound webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEvent {
	pub webhook_name: String,
	pub source: WebhookSource,
	pub event_type: String,
	pub payload: Value,
}

fn non_empty_str<'a>(value: Option<&'a Value>) -> Option<&'a str> {
	value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Derive the event type of an inbound request.
///
/// - github: the `X-GitHub-Event` header, suffixed with `.<action>` when the
///   body has a non-empty `action`
/// - slack: `event.type`, falling back to `type`
/// - generic: `type`
///
/// Returns an empty string when nothing is found.
pub fn extract_event_type(source: WebhookSource, headers: &HeaderMap, payload: &Value) -> String {
	match source {
		WebhookSource::Github => {
			let base = headers
				.get(GITHUB_EVENT_HEADER)
				.and_then(|v| v.to_str().ok())
				.unwrap_or("")
				.trim();
			if base.is_empty() {
				return String::new();
			}
			match non_empty_str(payload.get("action")) {
				Some(action) => format!("{base}.{action}"),
				None => base.to_string(),
			}
		}
		WebhookSource::Slack => non_empty_str(payload.get("event").and_then(|e| e.get("type")))
			.or_else(|| non_empty_str(payload.get("type")))
			.unwrap_or("")
			.to_string(),
		WebhookSource::Generic => non_empty_str(payload.get("type")).unwrap_or("").to_string(),
	}
}

/// Check an event type against a webhook's configured filter.
///
/// An empty filter matches everything. Otherwise the event type must equal the
/// filter or start with `<filter>.`, ignoring ASCII case.
pub fn matches_filter(filter: &str, event_type: &str) -> bool {
	let filter = filter.trim();
	if filter.is_empty() {
		return true;
	}
	if event_type.is_empty() {
		return false;
	}
	if event_type.eq_ignore_ascii_case(filter) {
		return true;
	}
	let event = event_type.to_ascii_lowercase();
	let prefix = format!("{}.", filter.to_ascii_lowercase());
	event.starts_with(&prefix)
}
