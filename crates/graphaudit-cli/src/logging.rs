// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs always go to stderr; stdout carries only the report.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init_tracing(default_level: &str, json: bool) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	let registry = tracing_subscriber::registry().with(filter);

	if json {
		registry
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		registry
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init();
	}
}
