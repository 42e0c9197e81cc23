// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tool policy rows. Scope and action are stored as text and interpreted by
//! the policy engine; this layer does not validate them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{new_id, parse_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPolicyRecord {
	pub id: String,
	pub scope: String,
	pub scope_id: String,
	pub tool_pattern: String,
	pub action: String,
	pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ToolPolicyStore: Send + Sync {
	async fn list_policies(&self) -> Result<Vec<ToolPolicyRecord>, DbError>;
	async fn create_policy(
		&self,
		scope: &str,
		scope_id: &str,
		tool_pattern: &str,
		action: &str,
	) -> Result<ToolPolicyRecord, DbError>;
	async fn delete_policy(&self, id: &str) -> Result<bool, DbError>;
	async fn count_policies(&self) -> Result<i64, DbError>;
}

#[async_trait]
impl ToolPolicyStore for ToolPolicyRepository {
	async fn list_policies(&self) -> Result<Vec<ToolPolicyRecord>, DbError> {
		self.list_policies().await
	}

	async fn create_policy(
		&self,
		scope: &str,
		scope_id: &str,
		tool_pattern: &str,
		action: &str,
	) -> Result<ToolPolicyRecord, DbError> {
		self.create_policy(scope, scope_id, tool_pattern, action).await
	}

	async fn delete_policy(&self, id: &str) -> Result<bool, DbError> {
		self.delete_policy(id).await
	}

	async fn count_policies(&self) -> Result<i64, DbError> {
		self.count_policies().await
	}
}

#[derive(Clone)]
pub struct ToolPolicyRepository {
	pool: SqlitePool,
}

impl ToolPolicyRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_policies(&self) -> Result<Vec<ToolPolicyRecord>, DbError> {
		let rows = sqlx::query(
			"SELECT id, scope, scope_id, tool_pattern, action, created_at FROM tool_policies ORDER BY created_at, id",
		)
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.iter()
			.filter_map(|row| match row_to_policy(row) {
				Ok(policy) => Some(policy),
				Err(e) => {
					tracing::warn!(error = %e, "skipping unreadable tool policy row");
					None
				}
			})
			.collect())
	}

	#[tracing::instrument(skip(self))]
	pub async fn create_policy(
		&self,
		scope: &str,
		scope_id: &str,
		tool_pattern: &str,
		action: &str,
	) -> Result<ToolPolicyRecord, DbError> {
		let id = new_id();
		let now = Utc::now();

		sqlx::query(
			r#"
			INSERT INTO tool_policies (id, scope, scope_id, tool_pattern, action, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&id)
		.bind(scope)
		.bind(scope_id)
		.bind(tool_pattern)
		.bind(action)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(policy_id = %id, "tool policy created");
		Ok(ToolPolicyRecord {
			id,
			scope: scope.to_string(),
			scope_id: scope_id.to_string(),
			tool_pattern: tool_pattern.to_string(),
			action: action.to_string(),
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_policy(&self, id: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM tool_policies WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_policies(&self) -> Result<i64, DbError> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tool_policies")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}
}

fn row_to_policy(row: &sqlx::sqlite::SqliteRow) -> Result<ToolPolicyRecord, DbError> {
	let created_at: String = row.try_get("created_at")?;

	Ok(ToolPolicyRecord {
		id: row.try_get("id")?,
		scope: row.try_get("scope")?,
		scope_id: row.try_get::<Option<String>, _>("scope_id")?.unwrap_or_default(),
		tool_pattern: row.try_get("tool_pattern")?,
		action: row.try_get("action")?,
		created_at: parse_timestamp(&created_at)?,
	})
}
