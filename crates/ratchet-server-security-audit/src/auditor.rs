// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::Utc;
use tracing::instrument;

use crate::checks::AuditCheck;
use crate::context::AuditContext;
use crate::finding::{AuditFinding, AuditSeverity, SecurityReport};

pub struct SecurityAuditor {
	ctx: AuditContext,
}

impl SecurityAuditor {
	pub fn new(ctx: AuditContext) -> Self {
		Self { ctx }
	}

	pub fn context(&self) -> &AuditContext {
		&self.ctx
	}

	pub fn checks(&self) -> &'static [AuditCheck] {
		&AuditCheck::ALL
	}

	/// Run every check in order and score the result.
	#[instrument(skip(self), fields(environment = %self.ctx.environment))]
	pub async fn run(&self) -> SecurityReport {
		let mut findings = Vec::new();
		for check in self.checks() {
			findings.extend(self.run_check(*check).await);
		}

		let report = SecurityReport::from_findings(findings, Utc::now());
		tracing::info!(
			score = report.score,
			critical = report.count(AuditSeverity::Critical),
			high = report.count(AuditSeverity::High),
			findings = report.findings.len(),
			"security audit complete"
		);
		report
	}

	pub async fn run_check(&self, check: AuditCheck) -> Vec<AuditFinding> {
		let findings = check.run(&self.ctx).await;
		tracing::debug!(check = check.name(), findings = findings.len(), "audit check finished");
		findings
	}
}
