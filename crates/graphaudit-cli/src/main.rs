// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! graphaudit binary.

use std::future::Future;
use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use graphaudit_core::{BoundedEnricher, Reporter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

mod args;
mod audit;
mod logging;

use args::Args;
use audit::run_audit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	// .env must be loaded before clap reads TENANT_ID / CLIENT_ID.
	let dotenv_path = dotenv::dotenv().ok();
	let args = Args::parse();
	logging::init_tracing(&args.log_level, args.json_logs);

	if let Some(path) = dotenv_path {
		debug!(path = %path.display(), "loaded .env");
	}

	let audit = args.command.audit();
	let config = args
		.tenant_config()
		.context("failed to load tenant configuration")?;
	let retry_config = args.retry_config();
	let http_client = graphaudit_common_http::new_client_with_timeout(args.request_timeout())
		.context("failed to build HTTP client")?;

	info!(audit = %audit, tenant_id = %config.tenant_id, "starting audit");

	let cancel = CancellationToken::new();
	spawn_cancellation(cancel.clone(), args.deadline());

	let report = run_audit(
		&config,
		http_client,
		retry_config,
		audit,
		&BoundedEnricher::new(args.concurrency),
		&cancel,
	)
	.await?;

	Reporter::new(args.format.into())
		.emit(&report)
		.context("failed to write report")?;

	Ok(())
}

/// Cancel the run on Ctrl-C or when the optional deadline passes.
fn spawn_cancellation(cancel: CancellationToken, deadline: Option<Duration>) {
	tokio::spawn(watch_cancellation(cancel, deadline, tokio::signal::ctrl_c()));
}

/// A failed `interrupt` is logged and never cancels.
async fn watch_cancellation<I>(cancel: CancellationToken, deadline: Option<Duration>, interrupt: I)
where
	I: Future<Output = io::Result<()>>,
{
	let expired = async {
		match deadline {
			Some(after) => tokio::time::sleep(after).await,
			None => std::future::pending::<()>().await,
		}
	};

	let interrupted = async {
		if let Err(e) = interrupt.await {
			error!(error = %e, "failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	tokio::select! {
		_ = cancel.cancelled() => return,
		_ = interrupted => warn!("interrupted, cancelling remaining lookups"),
		_ = expired => warn!(?deadline, "deadline reached, cancelling remaining lookups"),
	}
	cancel.cancel();
}
