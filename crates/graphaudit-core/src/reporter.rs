// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Renders a [`BatchReport`] at the process boundary.
//!
//! Matches go to stdout. The failure summary always goes to the diagnostic
//! stream (stderr) so that piping stdout yields only the match list.

use std::io::{self, Write};

use crate::model::BatchReport;

pub const NO_MATCHES: &str = "no matches";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
	/// One UPN per line.
	#[default]
	Text,
	/// The whole report as a JSON document.
	Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
	format: OutputFormat,
}

impl Reporter {
	pub fn new(format: OutputFormat) -> Self {
		Self { format }
	}

	/// Write to the real stdout and stderr.
	pub fn emit(&self, report: &BatchReport) -> io::Result<()> {
		let stdout = io::stdout();
		let stderr = io::stderr();
		self.write_to(report, &mut stdout.lock(), &mut stderr.lock())
	}

	pub fn write_to<W, D>(&self, report: &BatchReport, out: &mut W, diag: &mut D) -> io::Result<()>
	where
		W: Write,
		D: Write,
	{
		match self.format {
			OutputFormat::Text => {
				if report.matches.is_empty() {
					writeln!(out, "{NO_MATCHES}")?;
				}
				for record in &report.matches {
					writeln!(out, "{}", record.user_principal_name())?;
				}
			}
			OutputFormat::Json => {
				serde_json::to_writer_pretty(&mut *out, report)?;
				writeln!(out)?;
			}
		}
		out.flush()?;

		write_diagnostics(report, diag)
	}
}

fn write_diagnostics<D: Write>(report: &BatchReport, diag: &mut D) -> io::Result<()> {
	let failures = &report.failures;
	writeln!(
		diag,
		"audited {} principals: {} matches, {} enrichment failures (not found: {}, upstream: {}, cancelled: {})",
		report.principals,
		report.matches.len(),
		failures.total(),
		failures.not_found,
		failures.upstream,
		failures.cancelled,
	)?;
	for failed in &failures.failed {
		writeln!(diag, "  {}: {}", failed.user_principal_name, failed.error)?;
	}
	diag.flush()
}
