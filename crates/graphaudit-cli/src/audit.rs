// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::Context;
use graphaudit_auth::ClientCredentialsClient;
use graphaudit_common_config::TenantConfig;
use graphaudit_common_http::RetryConfig;
use graphaudit_core::{run_batch, BatchReport, BoundedEnricher};
use graphaudit_directory::{AuditKind, GraphDirectoryClient};
use tokio_util::sync::CancellationToken;

/// Authenticate, then run one audit batch against Graph.
///
/// Graph is never called unless a token was acquired. `cancel` covers token
/// acquisition as well as the batch.
pub async fn run_audit(
	config: &TenantConfig,
	http_client: reqwest::Client,
	retry_config: RetryConfig,
	audit: AuditKind,
	enricher: &BoundedEnricher,
	cancel: &CancellationToken,
) -> anyhow::Result<BatchReport> {
	let auth = ClientCredentialsClient::new(config.clone(), http_client.clone())
		.with_retry_config(retry_config.clone());
	let token = tokio::select! {
		biased;
		_ = cancel.cancelled() => anyhow::bail!("cancelled before a Graph access token was acquired"),
		token = auth.acquire_token() => token.context("failed to acquire Graph access token")?,
	};

	let directory = GraphDirectoryClient::new(&config.graph_base_url, token.token, http_client)
		.context("invalid Graph base URL")?
		.with_retry_config(retry_config);

	run_batch(Arc::new(directory), audit, enricher, cancel)
		.await
		.with_context(|| format!("{audit} audit failed"))
}
