// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use graphaudit_directory::{AuditKind, DirectoryClient, DirectoryError};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::correlator::Correlator;
use crate::enricher::BoundedEnricher;
use crate::model::BatchReport;

/// Batch-level failures. Any of these means no report is produced.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
	#[error("failed to fetch principals")]
	PrimaryFetch(#[source] DirectoryError),

	#[error("cancelled before the primary fetch completed")]
	Cancelled,
}

/// Fetch, enrich, correlate.
///
/// A failed primary fetch aborts before any enrichment. Cancellation after
/// the primary set is known still yields a report, with the unfinished
/// principals counted as cancelled.
#[instrument(skip(client, enricher, cancel), fields(audit = %audit))]
pub async fn run_batch(
	client: Arc<dyn DirectoryClient>,
	audit: AuditKind,
	enricher: &BoundedEnricher,
	cancel: &CancellationToken,
) -> Result<BatchReport, BatchError> {
	let principals = tokio::select! {
		biased;
		_ = cancel.cancelled() => return Err(BatchError::Cancelled),
		fetched = client.fetch_principals(audit) => fetched.map_err(BatchError::PrimaryFetch)?,
	};
	let total = principals.len();
	info!(principals = total, "primary set fetched");

	let results = enricher.enrich_with_client(client, principals, cancel).await;

	let correlator = Correlator::new(audit);
	let report = BatchReport {
		audit,
		principals: total,
		matches: correlator.select(&results),
		failures: correlator.failures(&results),
	};
	info!(
		matches = report.matches.len(),
		failures = report.failures.total(),
		"batch complete"
	);
	Ok(report)
}
