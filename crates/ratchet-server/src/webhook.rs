// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Inbound webhook intake: lookup, signature check, event typing, filtering.

use std::sync::Arc;

use http::HeaderMap;
use ratchet_common_webhook::{
	extract_event_type, is_fresh_slack_timestamp, matches_filter, verify_signature, WebhookEvent,
	WebhookSource, DEFAULT_SLACK_TOLERANCE_SECS,
};
use ratchet_server_db::WebhookStore;
use ratchet_server_secrets::SecretProvider;
use tracing::instrument;

use crate::error::{WebhookError, WebhookResult};

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
	/// Authenticated and matched the filter; hand off for task creation.
	Accepted(WebhookEvent),
	/// Authenticated but the event type did not match the filter.
	Filtered { event_type: String },
	/// Not authenticated.
	Rejected { reason: String },
	Disabled,
}

impl WebhookOutcome {
	pub fn is_accepted(&self) -> bool {
		matches!(self, WebhookOutcome::Accepted(_))
	}
}

pub struct WebhookReceiver {
	store: Arc<dyn WebhookStore>,
	secrets: Arc<dyn SecretProvider>,
	slack_tolerance_secs: i64,
}

impl WebhookReceiver {
	pub fn new(store: Arc<dyn WebhookStore>, secrets: Arc<dyn SecretProvider>) -> Self {
		Self {
			store,
			secrets,
			slack_tolerance_secs: DEFAULT_SLACK_TOLERANCE_SECS,
		}
	}

	pub fn with_slack_tolerance(mut self, secs: i64) -> Self {
		self.slack_tolerance_secs = secs;
		self
	}

	pub async fn receive(&self, name: &str, headers: &HeaderMap, body: &[u8]) -> WebhookResult<WebhookOutcome> {
		self.receive_at(name, headers, body, chrono::Utc::now().timestamp())
			.await
	}

	/// [`WebhookReceiver::receive`] with an explicit clock, in unix seconds.
	#[instrument(skip(self, headers, body), fields(body_len = body.len()))]
	pub async fn receive_at(
		&self,
		name: &str,
		headers: &HeaderMap,
		body: &[u8],
		now_unix: i64,
	) -> WebhookResult<WebhookOutcome> {
		let webhook = self
			.store
			.get_webhook_by_name(name)
			.await?
			.ok_or_else(|| WebhookError::UnknownWebhook(name.to_string()))?;

		if !webhook.enabled {
			tracing::debug!(webhook = %name, "delivery to disabled webhook");
			return Ok(WebhookOutcome::Disabled);
		}

		let source: WebhookSource = webhook.source.parse().map_err(|_| WebhookError::InvalidSource {
			name: webhook.name.clone(),
			source_name: webhook.source.clone(),
		})?;

		let secret = if webhook.secret_name.is_empty() {
			None
		} else {
			match self.secrets.get(&webhook.secret_name).await? {
				Some(secret) => Some(secret),
				None => {
					tracing::warn!(webhook = %name, secret = %webhook.secret_name, "webhook signing secret missing");
					return Ok(rejected("signing secret is not configured"));
				}
			}
		};

		let signature = header_str(headers, source.signature_header());
		let timestamp = source.timestamp_header().map(|h| header_str(headers, h));

		if let Some(secret) = &secret {
			if source == WebhookSource::Slack {
				let ts = timestamp.unwrap_or("");
				if !is_fresh_slack_timestamp(ts, now_unix, self.slack_tolerance_secs) {
					tracing::warn!(webhook = %name, "stale or missing slack timestamp");
					return Ok(rejected("request timestamp is missing or outside the allowed window"));
				}
			}
			if !verify_signature(source, secret.expose(), body, signature, timestamp) {
				tracing::warn!(webhook = %name, %source, "webhook signature mismatch");
				return Ok(rejected("signature mismatch"));
			}
		}

		let payload: serde_json::Value = serde_json::from_slice(body)?;
		let event_type = extract_event_type(source, headers, &payload);
		if !matches_filter(&webhook.filter, &event_type) {
			tracing::debug!(webhook = %name, %event_type, filter = %webhook.filter, "webhook event filtered");
			return Ok(WebhookOutcome::Filtered { event_type });
		}

		tracing::info!(webhook = %name, %source, %event_type, "webhook accepted");
		Ok(WebhookOutcome::Accepted(WebhookEvent {
			webhook_name: webhook.name,
			source,
			event_type,
			payload,
		}))
	}
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
	headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

fn rejected(reason: &str) -> WebhookOutcome {
	WebhookOutcome::Rejected {
		reason: reason.to_string(),
	}
}
