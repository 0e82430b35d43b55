// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use graphaudit_common_config::{
	require_secret_env, ConfigError, TenantConfig, DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_BASE_URL,
};
use graphaudit_common_http::{RetryConfig, DEFAULT_TIMEOUT};
use graphaudit_core::{OutputFormat, DEFAULT_CONCURRENCY_LIMIT};
use graphaudit_directory::AuditKind;

/// graphaudit - find shared mailboxes that hold admin roles, licenses or
/// sign-in rights.
///
/// Credentials come from flags or the environment (a `.env` file in the
/// working directory is loaded first). The client secret is read from
/// `CLIENT_SECRET_FILE` if set, otherwise `CLIENT_SECRET`.
#[derive(Parser, Debug)]
#[command(name = "graphaudit", version, about)]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,

	/// Directory (tenant) ID or verified domain
	#[arg(long, env = "TENANT_ID")]
	pub tenant_id: String,

	/// Application (client) ID of the app registration
	#[arg(long, env = "CLIENT_ID")]
	pub client_id: String,

	#[arg(long, env = "GRAPHAUDIT_AUTHORITY_HOST", default_value = DEFAULT_AUTHORITY_HOST, hide = true)]
	pub authority_host: String,

	#[arg(long, env = "GRAPHAUDIT_GRAPH_URL", default_value = DEFAULT_GRAPH_BASE_URL, hide = true)]
	pub graph_url: String,

	/// Maximum concurrent mailbox lookups
	#[arg(long, env = "GRAPHAUDIT_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
	pub concurrency: usize,

	/// Deadline for the whole batch, in seconds
	#[arg(long)]
	pub timeout_secs: Option<u64>,

	/// Per-request HTTP timeout, in seconds
	#[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
	pub request_timeout_secs: u64,

	/// Attempts per HTTP request, including the first
	#[arg(long, default_value_t = 3)]
	pub max_attempts: u32,

	#[arg(long, value_enum, default_value_t = Format::Text)]
	pub format: Format,

	/// Log level when RUST_LOG is unset
	#[arg(long, default_value = "warn")]
	pub log_level: String,

	/// Emit logs as JSON lines on stderr
	#[arg(long)]
	pub json_logs: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// Shared mailboxes that are members of a directory role
	AdminRoles,
	/// Shared mailboxes with an assigned license
	Licenses,
	/// Shared mailboxes whose account allows sign-in
	SignIn,
}

impl Command {
	pub fn audit(self) -> AuditKind {
		match self {
			Command::AdminRoles => AuditKind::AdminRoles,
			Command::Licenses => AuditKind::Licenses,
			Command::SignIn => AuditKind::SignInEnabled,
		}
	}
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
	Text,
	Json,
}

impl From<Format> for OutputFormat {
	fn from(format: Format) -> Self {
		match format {
			Format::Text => OutputFormat::Text,
			Format::Json => OutputFormat::Json,
		}
	}
}

impl Args {
	/// Reads the client secret from the environment and validates the result.
	pub fn tenant_config(&self) -> Result<TenantConfig, ConfigError> {
		let secret = require_secret_env("CLIENT_SECRET")?;
		let config = TenantConfig::new(&self.tenant_id, &self.client_id, secret)
			.with_authority_host(&self.authority_host)
			.with_graph_base_url(&self.graph_url);
		config.validate()?;
		Ok(config)
	}

	pub fn retry_config(&self) -> RetryConfig {
		RetryConfig::default().with_max_attempts(self.max_attempts)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs.max(1))
	}

	pub fn deadline(&self) -> Option<Duration> {
		self.timeout_secs.map(Duration::from_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	fn parse(extra: &[&str]) -> Args {
		let mut argv = vec![
			"graphaudit",
			"--tenant-id",
			"contoso.onmicrosoft.com",
			"--client-id",
			"app-id",
		];
		argv.extend_from_slice(extra);
		Args::try_parse_from(argv).unwrap()
	}

	#[test]
	fn command_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn subcommands_select_audit_kind() {
		assert_eq!(parse(&["admin-roles"]).command.audit(), AuditKind::AdminRoles);
		assert_eq!(parse(&["licenses"]).command.audit(), AuditKind::Licenses);
		assert_eq!(parse(&["sign-in"]).command.audit(), AuditKind::SignInEnabled);
	}

	#[test]
	fn flags_override_defaults() {
		let args = parse(&[
			"--concurrency",
			"4",
			"--timeout-secs",
			"90",
			"--max-attempts",
			"5",
			"--format",
			"json",
			"licenses",
		]);
		assert_eq!(args.concurrency, 4);
		assert_eq!(args.deadline(), Some(Duration::from_secs(90)));
		assert_eq!(args.retry_config().max_attempts, 5);
		assert_eq!(OutputFormat::from(args.format), OutputFormat::Json);
	}

	#[test]
	fn zero_attempts_still_tries_once() {
		let args = parse(&["--max-attempts", "0", "licenses"]);
		assert_eq!(args.retry_config().max_attempts, 1);
	}

	#[test]
	fn subcommand_is_required() {
		let err = Args::try_parse_from([
			"graphaudit",
			"--tenant-id",
			"t",
			"--client-id",
			"c",
		])
		.unwrap_err();
		assert_eq!(
			err.kind(),
			clap::error::ErrorKind::MissingSubcommand
		);
	}
}
