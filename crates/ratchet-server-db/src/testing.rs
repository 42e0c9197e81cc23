// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pools for tests in this and downstream crates.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::DbError;

/// Single-connection in-memory pool with the full schema applied.
///
/// One connection only: every connection to `:memory:` gets its own database.
pub async fn create_test_pool() -> Result<SqlitePool, DbError> {
	let pool = create_empty_test_pool().await?;
	crate::schema::apply_schema(&pool).await?;
	Ok(pool)
}

/// Single-connection in-memory pool with no tables.
pub async fn create_empty_test_pool() -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(":memory:")
		.map_err(|e| DbError::Internal(e.to_string()))?
		.create_if_missing(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await?;
	Ok(pool)
}
