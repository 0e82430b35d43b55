// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch-scoped records produced by enrichment and correlation.

use graphaudit_directory::{AuditKind, DirectoryError, MailboxPurpose, Principal};
use serde::Serialize;

/// Why a single principal could not be enriched. Never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum EnrichmentError {
	#[error("no mailbox")]
	NotFound,

	#[error("upstream error: {0}")]
	Upstream(String),

	#[error("cancelled before completion")]
	Cancelled,
}

impl From<DirectoryError> for EnrichmentError {
	fn from(err: DirectoryError) -> Self {
		if err.is_not_found() {
			EnrichmentError::NotFound
		} else {
			EnrichmentError::Upstream(err.to_string())
		}
	}
}

/// Exactly one per input principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentResult {
	/// Position of the principal in the primary fetch.
	pub sequence: usize,
	pub principal: Principal,
	pub outcome: Result<Option<MailboxPurpose>, EnrichmentError>,
}

impl EnrichmentResult {
	pub fn is_success(&self) -> bool {
		self.outcome.is_ok()
	}

	pub fn error(&self) -> Option<&EnrichmentError> {
		self.outcome.as_ref().err()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
	pub sequence: usize,
	pub principal: Principal,
	pub purpose: MailboxPurpose,
}

impl MatchRecord {
	pub fn user_principal_name(&self) -> &str {
		&self.principal.user_principal_name
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPrincipal {
	pub sequence: usize,
	pub user_principal_name: String,
	pub error: EnrichmentError,
}

/// Enrichment failures excluded from the match list, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
	pub not_found: usize,
	pub upstream: usize,
	pub cancelled: usize,
	pub failed: Vec<FailedPrincipal>,
}

impl FailureSummary {
	pub fn total(&self) -> usize {
		self.not_found + self.upstream + self.cancelled
	}

	pub fn is_empty(&self) -> bool {
		self.failed.is_empty()
	}

	pub(crate) fn record(&mut self, sequence: usize, principal: &Principal, error: &EnrichmentError) {
		match error {
			EnrichmentError::NotFound => self.not_found += 1,
			EnrichmentError::Upstream(_) => self.upstream += 1,
			EnrichmentError::Cancelled => self.cancelled += 1,
		}
		self.failed.push(FailedPrincipal {
			sequence,
			user_principal_name: principal.user_principal_name.clone(),
			error: error.clone(),
		});
	}
}

/// Everything a finished batch reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
	pub audit: AuditKind,
	/// Size of the primary set.
	pub principals: usize,
	pub matches: Vec<MatchRecord>,
	pub failures: FailureSummary,
}
