// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration primitives shared by the graphaudit crates.
//!
//! - [`Secret<T>`]: keeps the client secret and bearer tokens out of logs
//! - [`load_secret_env`] / [`require_secret_env`]: `VAR` / `VAR_FILE` loading
//! - [`TenantConfig`]: the credentials and endpoints for one tenant, built
//!   once at startup and passed to the auth and directory clients

pub mod env;
pub mod secret;
pub mod tenant;

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};
pub use secret::{Secret, SecretString, REDACTED};
pub use tenant::{
	ConfigError, TenantConfig, DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_BASE_URL, DEFAULT_GRAPH_SCOPE,
};
