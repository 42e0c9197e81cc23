// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::DbError;

/// Parse a stored timestamp. Accepts RFC 3339 and SQLite's
/// `YYYY-MM-DD HH:MM:SS` form, which rows inserted by hand tend to use.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
		return Ok(dt.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
		.or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
		.map(|naive| naive.and_utc())
		.map_err(|e| DbError::Internal(format!("invalid timestamp '{value}': {e}")))
}

pub(crate) fn new_id() -> String {
	uuid::Uuid::new_v4().to_string()
}
