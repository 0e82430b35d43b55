// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP transport for graphaudit.
//!
//! Every outbound request (token endpoint and Graph) is sent through a client
//! built here, so User-Agent and timeouts stay consistent. Transport-level
//! retry lives here too; callers above the transport never retry on their own.

mod client;
mod retry;

pub use client::{builder, new_client_with_timeout, user_agent, DEFAULT_TIMEOUT};
pub use retry::{is_retryable_status, retry, RetryConfig, RetryableError};
