// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Security self-audit.
//!
//! [`SecurityAuditor`] runs the fixed [`AuditCheck`] battery against an
//! [`AuditContext`] and produces a [`SecurityReport`] scored from 0 to 100.

pub mod auditor;
pub mod checks;
pub mod context;
pub mod finding;
pub mod patterns;
pub mod services;

pub use auditor::SecurityAuditor;
pub use checks::{AuditCheck, MIN_AUTH_TOKEN_LEN, TRANSCRIPT_SCAN_LIMIT};
pub use context::AuditContext;
pub use finding::{compute_score, summarize, AuditFinding, AuditSeverity, SecurityReport};
pub use patterns::{detect, SecretPattern};
pub use services::{ServiceRegistry, StaticServiceRegistry, RATE_LIMIT_SERVICE, VAULT_DEV_SERVICE};
