// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use graphaudit_directory::AuditKind;

use crate::model::{EnrichmentResult, FailureSummary, MatchRecord};

/// Applies `primary attribute present AND purpose == shared` to enriched
/// principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correlator {
	audit: AuditKind,
}

impl Correlator {
	pub fn new(audit: AuditKind) -> Self {
		Self { audit }
	}

	/// Matching principals in fetch order. Failed enrichments never match.
	pub fn select(&self, results: &[EnrichmentResult]) -> Vec<MatchRecord> {
		let mut matches: Vec<MatchRecord> = results
			.iter()
			.filter_map(|result| match result.outcome {
				Ok(Some(purpose))
					if purpose.is_shared()
						&& self.audit.primary_attribute_present(&result.principal) =>
				{
					Some(MatchRecord {
						sequence: result.sequence,
						principal: result.principal.clone(),
						purpose,
					})
				}
				_ => None,
			})
			.collect();
		matches.sort_by_key(|m| m.sequence);
		matches
	}

	/// The results `select` excluded because enrichment failed.
	pub fn failures(&self, results: &[EnrichmentResult]) -> FailureSummary {
		let mut failed: Vec<&EnrichmentResult> =
			results.iter().filter(|r| !r.is_success()).collect();
		failed.sort_by_key(|r| r.sequence);

		let mut summary = FailureSummary::default();
		for result in failed {
			if let Err(error) = &result.outcome {
				summary.record(result.sequence, &result.principal, error);
			}
		}
		summary
	}
}
