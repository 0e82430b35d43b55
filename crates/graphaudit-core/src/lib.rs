// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The audit pipeline: fetch principals, enrich each with its mailbox
//! purpose under a concurrency ceiling, keep the shared mailboxes that carry
//! the audited attribute, report.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use graphaudit_core::{run_batch, BoundedEnricher, OutputFormat, Reporter};
//! use graphaudit_directory::{AuditKind, DirectoryClient};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(client: Arc<dyn DirectoryClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let report = run_batch(
//! 	client,
//! 	AuditKind::Licenses,
//! 	&BoundedEnricher::default(),
//! 	&CancellationToken::new(),
//! )
//! .await?;
//! Reporter::new(OutputFormat::Text).emit(&report)?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod correlator;
pub mod enricher;
pub mod model;
pub mod reporter;

pub use batch::{run_batch, BatchError};
pub use correlator::Correlator;
pub use enricher::{BoundedEnricher, DEFAULT_CONCURRENCY_LIMIT};
pub use model::{
	BatchReport, EnrichmentError, EnrichmentResult, FailedPrincipal, FailureSummary, MatchRecord,
};
pub use reporter::{OutputFormat, Reporter, NO_MATCHES};
