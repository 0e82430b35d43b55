// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded, cancellable per-principal enrichment.
//!
//! `min(C, N)` workers pull sequence numbers from a shared queue and perform
//! one fetch at a time, so at most `C` fetches are ever in flight. Results
//! flow back over a channel. Each fetch runs in its own task; a fetch that
//! panics is recorded as [`EnrichmentError::Upstream`] and its worker moves on
//! to the next principal. Once every worker has exited, any sequence that
//! never reported is filled in as [`EnrichmentError::Cancelled`], so the
//! output always has one result per input principal.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use graphaudit_directory::{DirectoryClient, DirectoryError, MailboxPurpose, Principal};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::model::{EnrichmentError, EnrichmentResult};

/// Ceiling on concurrent mailbox lookups when none is configured.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedEnricher {
	concurrency_limit: usize,
}

impl Default for BoundedEnricher {
	fn default() -> Self {
		Self::new(DEFAULT_CONCURRENCY_LIMIT)
	}
}

impl BoundedEnricher {
	/// A limit of 0 is treated as 1.
	pub fn new(concurrency_limit: usize) -> Self {
		Self {
			concurrency_limit: concurrency_limit.max(1),
		}
	}

	pub fn concurrency_limit(&self) -> usize {
		self.concurrency_limit
	}

	/// Enrich every principal using `client`.
	pub async fn enrich_with_client(
		&self,
		client: Arc<dyn DirectoryClient>,
		principals: Vec<Principal>,
		cancel: &CancellationToken,
	) -> Vec<EnrichmentResult> {
		self.enrich_all(principals, cancel, move |principal| {
			let client = Arc::clone(&client);
			async move { client.fetch_mailbox_purpose(&principal).await }
		})
		.await
	}

	/// Run `fetch` once per principal with at most `concurrency_limit` calls
	/// in flight.
	///
	/// Returns exactly `principals.len()` results ordered by sequence. Failed
	/// fetches are recorded on their result and never stop the batch. When
	/// `cancel` fires, in-flight fetches are dropped and every principal not
	/// yet finished is recorded as cancelled without calling `fetch`.
	#[instrument(
		level = "debug",
		skip_all,
		fields(principals = principals.len(), limit = self.concurrency_limit)
	)]
	pub async fn enrich_all<F, Fut>(
		&self,
		principals: Vec<Principal>,
		cancel: &CancellationToken,
		fetch: F,
	) -> Vec<EnrichmentResult>
	where
		F: Fn(Principal) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<MailboxPurpose>, DirectoryError>> + Send + 'static,
	{
		let total = principals.len();
		let principals: Arc<[Principal]> = principals.into();
		let queue = Arc::new(Mutex::new((0..total).collect::<VecDeque<usize>>()));
		let fetch = Arc::new(fetch);
		let (tx, mut rx) = mpsc::unbounded_channel();

		let worker_count = self.concurrency_limit.min(total);
		let mut workers = JoinSet::new();
		for worker in 0..worker_count {
			workers.spawn(run_worker(
				worker,
				Arc::clone(&principals),
				Arc::clone(&queue),
				Arc::clone(&fetch),
				tx.clone(),
				cancel.clone(),
			));
		}
		drop(tx);
		debug!(workers = worker_count, "enrichment workers started");

		let mut slots: Vec<Option<EnrichmentResult>> = vec![None; total];
		while let Some(result) = rx.recv().await {
			let slot = &mut slots[result.sequence];
			if slot.is_some() {
				warn!(sequence = result.sequence, "duplicate enrichment result ignored");
				continue;
			}
			*slot = Some(result);
		}

		while let Some(joined) = workers.join_next().await {
			if let Err(e) = joined {
				warn!(error = %e, "enrichment worker did not finish");
			}
		}

		let results: Vec<EnrichmentResult> = slots
			.into_iter()
			.enumerate()
			.map(|(sequence, slot)| {
				slot.unwrap_or_else(|| EnrichmentResult {
					sequence,
					principal: principals[sequence].clone(),
					outcome: Err(EnrichmentError::Cancelled),
				})
			})
			.collect();

		let failed = results.iter().filter(|r| !r.is_success()).count();
		info!(
			principals = total,
			succeeded = total - failed,
			failed,
			cancelled = cancel.is_cancelled(),
			"enrichment complete"
		);
		results
	}
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}

fn next_sequence(queue: &Mutex<VecDeque<usize>>) -> Option<usize> {
	queue
		.lock()
		.unwrap_or_else(PoisonError::into_inner)
		.pop_front()
}

async fn run_worker<F, Fut>(
	worker: usize,
	principals: Arc<[Principal]>,
	queue: Arc<Mutex<VecDeque<usize>>>,
	fetch: Arc<F>,
	results: mpsc::UnboundedSender<EnrichmentResult>,
	cancel: CancellationToken,
) where
	F: Fn(Principal) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<Option<MailboxPurpose>, DirectoryError>> + Send + 'static,
{
	let mut handled = 0usize;

	while let Some(sequence) = next_sequence(&queue) {
		let principal = principals[sequence].clone();

		let outcome = if cancel.is_cancelled() {
			Err(EnrichmentError::Cancelled)
		} else {
			// A panicking fetch is contained in its own task so the worker keeps
			// draining the queue.
			let mut call = tokio::spawn((*fetch)(principal.clone()));
			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					call.abort();
					Err(EnrichmentError::Cancelled)
				}
				joined = &mut call => match joined {
					Ok(fetched) => fetched.map_err(EnrichmentError::from),
					Err(e) if e.is_panic() => Err(EnrichmentError::Upstream(format!(
						"lookup panicked: {}",
						panic_message(e.into_panic())
					))),
					Err(_) => Err(EnrichmentError::Cancelled),
				},
			}
		};

		match &outcome {
			Err(EnrichmentError::Cancelled) => {
				debug!(upn = %principal.user_principal_name, "enrichment cancelled")
			}
			Err(e) => warn!(upn = %principal.user_principal_name, error = %e, "enrichment failed"),
			Ok(purpose) => debug!(
				upn = %principal.user_principal_name,
				purpose = ?purpose,
				"principal enriched"
			),
		}

		handled += 1;
		if results
			.send(EnrichmentResult {
				sequence,
				principal,
				outcome,
			})
			.is_err()
		{
			break;
		}
	}

	debug!(worker, handled, "enrichment worker drained");
}
