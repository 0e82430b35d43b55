// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for directory access.

use std::time::Duration;

use graphaudit_common_http::{is_retryable_status, RetryableError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
	/// Network-level failure talking to Graph.
	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("request timed out")]
	Timeout,

	/// Graph answered `429 Too Many Requests`.
	#[error("throttled by Graph")]
	RateLimited { retry_after: Option<Duration> },

	/// Any other non-2xx response.
	#[error("Graph returned {status}{}: {message}", odata_code(.code))]
	Status {
		status: u16,
		code: Option<String>,
		message: String,
	},

	/// The requested object (typically a mailbox) does not exist.
	#[error("not found: {resource}")]
	NotFound { resource: String },

	/// A 2xx body that does not match the expected record shape.
	#[error("unexpected response shape: {0}")]
	Decode(String),

	#[error("invalid Graph URL: {0}")]
	InvalidUrl(String),
}

fn odata_code(code: &Option<String>) -> String {
	code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

impl DirectoryError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, DirectoryError::NotFound { .. })
	}
}

impl RetryableError for DirectoryError {
	fn is_retryable(&self) -> bool {
		match self {
			DirectoryError::Transport(e) => e.is_retryable(),
			DirectoryError::Timeout | DirectoryError::RateLimited { .. } => true,
			DirectoryError::Status { status, .. } => reqwest::StatusCode::from_u16(*status)
				.map(is_retryable_status)
				.unwrap_or(false),
			DirectoryError::NotFound { .. }
			| DirectoryError::Decode(_)
			| DirectoryError::InvalidUrl(_) => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			DirectoryError::RateLimited { retry_after } => *retry_after,
			_ => None,
		}
	}
}
