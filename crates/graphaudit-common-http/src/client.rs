// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Default per-request timeout; the binary exposes it as `--request-timeout-secs`.
///
/// Graph list pages can be slow on large tenants, so this is generous; the
/// overall batch deadline is enforced separately by the caller.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a client builder carrying the graphaudit User-Agent.
///
/// # Example
/// ```ignore
/// let client = graphaudit_common_http::builder()
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the builder error instead of panicking: a TLS backend that fails
/// to initialise is reported as a fatal startup error by the binary.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

/// Returns the User-Agent string: `graphaudit/{version} ({os}-{arch})`.
pub fn user_agent() -> String {
	format!(
		"graphaudit/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
