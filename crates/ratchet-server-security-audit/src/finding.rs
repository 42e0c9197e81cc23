// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Findings, severities, and the scored report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a finding, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
	Info,
	Low,
	Medium,
	High,
	Critical,
}

impl AuditSeverity {
	/// All severities from most to least severe.
	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Critical,
			AuditSeverity::High,
			AuditSeverity::Medium,
			AuditSeverity::Low,
			AuditSeverity::Info,
		]
	}

	/// Points deducted from the score for one finding of this severity.
	pub fn penalty(&self) -> u32 {
		match self {
			AuditSeverity::Critical => 20,
			AuditSeverity::High => 10,
			AuditSeverity::Medium => 5,
			AuditSeverity::Low => 2,
			AuditSeverity::Info => 0,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditSeverity::Info => "info",
			AuditSeverity::Low => "low",
			AuditSeverity::Medium => "medium",
			AuditSeverity::High => "high",
			AuditSeverity::Critical => "critical",
		}
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
	pub check: String,
	pub severity: AuditSeverity,
	pub title: String,
	pub description: String,
	pub recommendation: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub references: Vec<String>,
}

impl AuditFinding {
	pub fn new(
		check: impl Into<String>,
		severity: AuditSeverity,
		title: impl Into<String>,
		description: impl Into<String>,
		recommendation: impl Into<String>,
	) -> Self {
		Self {
			check: check.into(),
			severity,
			title: title.into(),
			description: description.into(),
			recommendation: recommendation.into(),
			references: Vec::new(),
		}
	}

	pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
		self.references.push(reference.into());
		self
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
	pub findings: Vec<AuditFinding>,
	/// Count per severity; every severity is present, zero included.
	pub summary: BTreeMap<AuditSeverity, usize>,
	pub score: u8,
	pub generated_at: DateTime<Utc>,
}

impl SecurityReport {
	pub fn from_findings(findings: Vec<AuditFinding>, generated_at: DateTime<Utc>) -> Self {
		let summary = summarize(&findings);
		let score = compute_score(&findings);
		Self {
			findings,
			summary,
			score,
			generated_at,
		}
	}

	pub fn count(&self, severity: AuditSeverity) -> usize {
		self.summary.get(&severity).copied().unwrap_or(0)
	}

	pub fn highest_severity(&self) -> Option<AuditSeverity> {
		self.findings.iter().map(|f| f.severity).max()
	}
}

pub fn summarize(findings: &[AuditFinding]) -> BTreeMap<AuditSeverity, usize> {
	let mut summary: BTreeMap<AuditSeverity, usize> =
		AuditSeverity::all().iter().map(|s| (*s, 0)).collect();
	for finding in findings {
		*summary.entry(finding.severity).or_insert(0) += 1;
	}
	summary
}

/// `100 - 20*critical - 10*high - 5*medium - 2*low`, floored at zero.
pub fn compute_score(findings: &[AuditFinding]) -> u8 {
	let penalty: u32 = findings
		.iter()
		.map(|f| f.severity.penalty())
		.fold(0u32, |acc, p| acc.saturating_add(p));
	100u32.saturating_sub(penalty) as u8
}
