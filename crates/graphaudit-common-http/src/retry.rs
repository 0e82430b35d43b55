// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transport retry with exponential backoff.
//!
//! Graph throttles with `429` and a `Retry-After` header. Errors may report
//! that hint through [`RetryableError::retry_after`]; it replaces the computed
//! backoff for that attempt, capped at `max_delay`.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	/// Total attempts including the first. `1` disables retry.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(250),
			max_delay: Duration::from_secs(10),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);
		self
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// Server-provided delay before the next attempt, if any.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

/// Statuses worth another attempt: throttling, timeouts and gateway failures.
pub fn is_retryable_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::TOO_MANY_REQUESTS
			| StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT
	)
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self.status().is_some_and(is_retryable_status)
	}
}

fn backoff_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped = exponential.min(cfg.max_delay.as_secs_f64());

	let delay = if cfg.jitter {
		capped * (0.5 + fastrand::f64())
	} else {
		capped
	};

	Duration::from_secs_f64(delay)
}

fn next_delay<E: RetryableError>(cfg: &RetryConfig, err: &E, attempt: u32) -> Duration {
	match err.retry_after() {
		Some(hint) => hint.min(cfg.max_delay),
		None => backoff_delay(cfg, attempt),
	}
}

/// Runs `f` until it succeeds, returns a non-retryable error, or
/// `cfg.max_attempts` attempts have been made.
///
/// `operation` labels the log lines so throttling on a particular endpoint
/// is visible at `warn` level.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, operation: &str, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		match f().await {
			Ok(value) => return Ok(value),
			Err(err) => {
				attempt += 1;

				if !err.is_retryable() {
					debug!(operation, attempt, error = %err, "non-retryable transport error");
					return Err(err);
				}

				if attempt >= max_attempts {
					warn!(operation, attempt, max_attempts, error = %err, "retry attempts exhausted");
					return Err(err);
				}

				let delay = next_delay(cfg, &err, attempt - 1);
				warn!(
					operation,
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"retrying request"
				);
				tokio::time::sleep(delay).await;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fmt;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct FakeError {
		retryable: bool,
		retry_after: Option<Duration>,
	}

	impl fmt::Display for FakeError {
		fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
			write!(f, "fake error (retryable: {})", self.retryable)
		}
	}

	impl RetryableError for FakeError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}

		fn retry_after(&self) -> Option<Duration> {
			self.retry_after
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	#[tokio::test]
	async fn non_retryable_error_returns_after_one_attempt() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(), FakeError> = retry(&fast_config(5), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError {
					retryable: false,
					retry_after: None,
				})
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retryable_error_stops_at_max_attempts() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<(), FakeError> = retry(&fast_config(3), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError {
					retryable: true,
					retry_after: None,
				})
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn recovers_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let result: Result<&str, FakeError> = retry(&fast_config(4), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				if counter.fetch_add(1, Ordering::SeqCst) < 2 {
					Err(FakeError {
						retryable: true,
						retry_after: None,
					})
				} else {
					Ok("ok")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "ok");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn single_attempt_config_never_retries() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = Arc::clone(&calls);

		let _: Result<(), FakeError> = retry(&RetryConfig::default().with_max_attempts(1), "test", || {
			let counter = Arc::clone(&counter);
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(FakeError {
					retryable: true,
					retry_after: None,
				})
			}
		})
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn retry_after_hint_is_capped_by_max_delay() {
		let cfg = fast_config(3);
		let err = FakeError {
			retryable: true,
			retry_after: Some(Duration::from_secs(120)),
		};
		assert_eq!(next_delay(&cfg, &err, 0), cfg.max_delay);
	}

	#[test]
	fn backoff_without_jitter_is_deterministic_and_capped() {
		let cfg = RetryConfig {
			max_attempts: 10,
			base_delay: Duration::from_millis(125),
			max_delay: Duration::from_secs(1),
			backoff_factor: 2.0,
			jitter: false,
		};
		assert_eq!(backoff_delay(&cfg, 0), Duration::from_millis(125));
		assert_eq!(backoff_delay(&cfg, 1), Duration::from_millis(250));
		for attempt in 2..10 {
			assert!(backoff_delay(&cfg, attempt) <= cfg.max_delay);
		}
	}

	#[test]
	fn with_max_attempts_never_goes_below_one() {
		assert_eq!(RetryConfig::default().with_max_attempts(0).max_attempts, 1);
		assert_eq!(RetryConfig::default().with_max_attempts(7).max_attempts, 7);
	}

	#[test]
	fn throttling_and_gateway_statuses_are_retryable() {
		for status in [429, 408, 500, 502, 503, 504] {
			assert!(is_retryable_status(StatusCode::from_u16(status).unwrap()));
		}
		for status in [400, 401, 403, 404, 409] {
			assert!(!is_retryable_status(StatusCode::from_u16(status).unwrap()));
		}
	}
}
