// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::{conflict_on_unique, DbError};
use crate::types::{new_id, parse_timestamp};

/// A registered inbound webhook. `secret_name` refers to a secret in the
/// secret store, never the secret value itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRecord {
	pub id: String,
	pub source: String,
	pub name: String,
	pub secret_name: String,
	pub filter: String,
	pub task_template: String,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWebhook {
	pub source: String,
	pub name: String,
	pub secret_name: String,
	pub filter: String,
	pub task_template: String,
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
	async fn create_webhook(&self, webhook: &NewWebhook) -> Result<WebhookRecord, DbError>;
	async fn get_webhook_by_name(&self, name: &str) -> Result<Option<WebhookRecord>, DbError>;
	async fn list_webhooks(&self) -> Result<Vec<WebhookRecord>, DbError>;
	async fn set_webhook_enabled(&self, name: &str, enabled: bool) -> Result<bool, DbError>;
	async fn delete_webhook(&self, name: &str) -> Result<bool, DbError>;
}

#[async_trait]
impl WebhookStore for WebhookRepository {
	async fn create_webhook(&self, webhook: &NewWebhook) -> Result<WebhookRecord, DbError> {
		self.create_webhook(webhook).await
	}

	async fn get_webhook_by_name(&self, name: &str) -> Result<Option<WebhookRecord>, DbError> {
		self.get_webhook_by_name(name).await
	}

	async fn list_webhooks(&self) -> Result<Vec<WebhookRecord>, DbError> {
		self.list_webhooks().await
	}

	async fn set_webhook_enabled(&self, name: &str, enabled: bool) -> Result<bool, DbError> {
		self.set_webhook_enabled(name, enabled).await
	}

	async fn delete_webhook(&self, name: &str) -> Result<bool, DbError> {
		self.delete_webhook(name).await
	}
}

#[derive(Clone)]
pub struct WebhookRepository {
	pool: SqlitePool,
}

impl WebhookRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, webhook), fields(name = %webhook.name, source = %webhook.source))]
	pub async fn create_webhook(&self, webhook: &NewWebhook) -> Result<WebhookRecord, DbError> {
		let id = new_id();
		let now = Utc::now();

		sqlx::query(
			r#"
			INSERT INTO webhooks (id, source, name, secret_name, filter, task_template, enabled, created_at)
			VALUES (?, ?, ?, ?, ?, ?, 1, ?)
			"#,
		)
		.bind(&id)
		.bind(&webhook.source)
		.bind(&webhook.name)
		.bind(&webhook.secret_name)
		.bind(&webhook.filter)
		.bind(&webhook.task_template)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(conflict_on_unique("Webhook"))?;

		Ok(WebhookRecord {
			id,
			source: webhook.source.clone(),
			name: webhook.name.clone(),
			secret_name: webhook.secret_name.clone(),
			filter: webhook.filter.clone(),
			task_template: webhook.task_template.clone(),
			enabled: true,
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_webhook_by_name(&self, name: &str) -> Result<Option<WebhookRecord>, DbError> {
		let row = sqlx::query(
			"SELECT id, source, name, secret_name, filter, task_template, enabled, created_at FROM webhooks WHERE name = ?",
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(row_to_webhook).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_webhooks(&self) -> Result<Vec<WebhookRecord>, DbError> {
		let rows = sqlx::query(
			"SELECT id, source, name, secret_name, filter, task_template, enabled, created_at FROM webhooks ORDER BY name",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_webhook).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn set_webhook_enabled(&self, name: &str, enabled: bool) -> Result<bool, DbError> {
		let result = sqlx::query("UPDATE webhooks SET enabled = ? WHERE name = ?")
			.bind(enabled as i64)
			.bind(name)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_webhook(&self, name: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM webhooks WHERE name = ?")
			.bind(name)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}

fn row_to_webhook(row: &sqlx::sqlite::SqliteRow) -> Result<WebhookRecord, DbError> {
	let created_at: String = row.get("created_at");

	Ok(WebhookRecord {
		id: row.get("id"),
		source: row.get("source"),
		name: row.get("name"),
		secret_name: row.get("secret_name"),
		filter: row.get("filter"),
		task_template: row.get("task_template"),
		enabled: row.get::<i64, _>("enabled") != 0,
		created_at: parse_timestamp(&created_at)?,
	})
}
