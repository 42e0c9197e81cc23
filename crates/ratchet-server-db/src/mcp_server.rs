// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configured MCP servers. Stdio servers carry a `command` and `args`, HTTP
//! servers a `url`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::{conflict_on_unique, DbError};
use crate::types::{new_id, parse_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerRecord {
	pub id: String,
	pub name: String,
	pub command: String,
	pub args: Vec<String>,
	pub url: String,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait McpServerStore: Send + Sync {
	async fn create_mcp_server(
		&self,
		name: &str,
		command: &str,
		args: &[String],
		url: &str,
	) -> Result<McpServerRecord, DbError>;
	async fn list_mcp_servers(&self) -> Result<Vec<McpServerRecord>, DbError>;
	async fn delete_mcp_server(&self, name: &str) -> Result<bool, DbError>;
}

#[async_trait]
impl McpServerStore for McpServerRepository {
	async fn create_mcp_server(
		&self,
		name: &str,
		command: &str,
		args: &[String],
		url: &str,
	) -> Result<McpServerRecord, DbError> {
		self.create_mcp_server(name, command, args, url).await
	}

	async fn list_mcp_servers(&self) -> Result<Vec<McpServerRecord>, DbError> {
		self.list_mcp_servers().await
	}

	async fn delete_mcp_server(&self, name: &str) -> Result<bool, DbError> {
		self.delete_mcp_server(name).await
	}
}

#[derive(Clone)]
pub struct McpServerRepository {
	pool: SqlitePool,
}

impl McpServerRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, args))]
	pub async fn create_mcp_server(
		&self,
		name: &str,
		command: &str,
		args: &[String],
		url: &str,
	) -> Result<McpServerRecord, DbError> {
		let id = new_id();
		let now = Utc::now();
		let args_json = serde_json::to_string(args)?;

		sqlx::query(
			r#"
			INSERT INTO mcp_servers (id, name, command, args, url, enabled, created_at)
			VALUES (?, ?, ?, ?, ?, 1, ?)
			"#,
		)
		.bind(&id)
		.bind(name)
		.bind(command)
		.bind(&args_json)
		.bind(url)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(conflict_on_unique("MCP server"))?;

		Ok(McpServerRecord {
			id,
			name: name.to_string(),
			command: command.to_string(),
			args: args.to_vec(),
			url: url.to_string(),
			enabled: true,
			created_at: now,
		})
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_mcp_servers(&self) -> Result<Vec<McpServerRecord>, DbError> {
		let rows = sqlx::query(
			"SELECT id, name, command, args, url, enabled, created_at FROM mcp_servers ORDER BY name",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_mcp_server).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_mcp_server(&self, name: &str) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM mcp_servers WHERE name = ?")
			.bind(name)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}

fn row_to_mcp_server(row: &sqlx::sqlite::SqliteRow) -> Result<McpServerRecord, DbError> {
	let args: String = row.get("args");
	let created_at: String = row.get("created_at");

	Ok(McpServerRecord {
		id: row.get("id"),
		name: row.get("name"),
		command: row.get("command"),
		args: serde_json::from_str(&args)?,
		url: row.get("url"),
		enabled: row.get::<i64, _>("enabled") != 0,
		created_at: parse_timestamp(&created_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_args_roundtrip_as_json() {
		let pool = crate::testing::create_test_pool().await.unwrap();
		let repo = McpServerRepository::new(pool);

		let args = vec!["-c".to_string(), "echo hi".to_string()];
		repo.create_mcp_server("shell", "/bin/sh", &args, "").await.unwrap();

		let servers = repo.list_mcp_servers().await.unwrap();
		assert_eq!(servers.len(), 1);
		assert_eq!(servers[0].args, args);
		assert_eq!(servers[0].command, "/bin/sh");

		assert!(repo.delete_mcp_server("shell").await.unwrap());
	}

	#[tokio::test]
	async fn test_malformed_args_is_serialization_error() {
		let pool = crate::testing::create_test_pool().await.unwrap();
		sqlx::query("INSERT INTO mcp_servers (id, name, command, args) VALUES ('m1', 'bad', 'x', 'not json')")
			.execute(&pool)
			.await
			.unwrap();

		let repo = McpServerRepository::new(pool);
		assert!(matches!(
			repo.list_mcp_servers().await,
			Err(DbError::Serialization(_))
		));
	}
}
