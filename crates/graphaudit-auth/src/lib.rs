// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth 2.0 client-credentials flow against the Microsoft identity platform.
//!
//! The audit tools run unattended as an app registration, so the only grant
//! needed is `client_credentials`:
//!
//! ```text
//! POST {authority}/{tenant}/oauth2/v2.0/token
//! grant_type=client_credentials&client_id=..&client_secret=..&scope=https://graph.microsoft.com/.default
//! ```
//!
//! The response carries a bearer token for Graph. It is wrapped in
//! [`SecretString`] as soon as it is parsed and never logged.
//!
//! # Example
//!
//! ```rust,no_run
//! use graphaudit_auth::ClientCredentialsClient;
//! use graphaudit_common_config::{require_secret_env, TenantConfig};
//! use graphaudit_common_http::{new_client_with_timeout, DEFAULT_TIMEOUT};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let secret = require_secret_env("CLIENT_SECRET")?;
//! let config = TenantConfig::new("contoso.onmicrosoft.com", "app-id", secret);
//! let client = ClientCredentialsClient::new(config, new_client_with_timeout(DEFAULT_TIMEOUT)?);
//! let token = client.acquire_token().await?;
//! println!("token expires in {}s", token.expires_in);
//! # Ok(())
//! # }
//! ```

use graphaudit_common_config::{ConfigError, SecretString, TenantConfig};
use graphaudit_common_http::{is_retryable_status, retry, RetryConfig, RetryableError};
use serde::Deserialize;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	#[error("invalid tenant configuration: {0}")]
	Config(#[from] ConfigError),

	#[error("token request failed: {0}")]
	HttpRequest(#[from] reqwest::Error),

	/// The identity platform answered with an OAuth error
	/// (`invalid_client`, `unauthorized_client`, ...).
	#[error("token request rejected ({status}): {error}{}", describe(.description))]
	Rejected {
		status: u16,
		error: String,
		description: Option<String>,
	},

	#[error("failed to parse token response: {0}")]
	ParseError(String),
}

fn describe(description: &Option<String>) -> String {
	description
		.as_deref()
		.map(|d| format!(": {d}"))
		.unwrap_or_default()
}

impl RetryableError for AuthError {
	fn is_retryable(&self) -> bool {
		match self {
			AuthError::HttpRequest(e) => e.is_retryable(),
			AuthError::Rejected { status, .. } => reqwest::StatusCode::from_u16(*status)
				.map(is_retryable_status)
				.unwrap_or(false),
			AuthError::Config(_) | AuthError::ParseError(_) => false,
		}
	}
}

// =============================================================================
// Response types
// =============================================================================

/// A bearer token for Graph.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
	#[serde(rename = "access_token")]
	pub token: SecretString,
	pub token_type: String,
	/// Lifetime in seconds from issue.
	pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
	error: String,
	error_description: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct ClientCredentialsClient {
	config: TenantConfig,
	http_client: reqwest::Client,
	retry_config: RetryConfig,
}

impl ClientCredentialsClient {
	pub fn new(config: TenantConfig, http_client: reqwest::Client) -> Self {
		Self {
			config,
			http_client,
			retry_config: RetryConfig::default(),
		}
	}

	pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
		self.retry_config = retry_config;
		self
	}

	/// Exchange the client credentials for a Graph access token.
	///
	/// # Errors
	///
	/// - [`AuthError::Config`]: the tenant configuration failed validation.
	/// - [`AuthError::HttpRequest`]: network failure after transport retries.
	/// - [`AuthError::Rejected`]: the identity platform refused the credentials.
	/// - [`AuthError::ParseError`]: a 2xx body without a usable token.
	#[tracing::instrument(
		skip(self),
		name = "ClientCredentialsClient::acquire_token",
		fields(tenant_id = %self.config.tenant_id, client_id = %self.config.client_id)
	)]
	pub async fn acquire_token(&self) -> Result<AccessToken, AuthError> {
		self.config.validate()?;

		let token = retry(&self.retry_config, "token", || self.request_token()).await?;
		tracing::info!(expires_in = token.expires_in, "access token acquired");
		Ok(token)
	}

	async fn request_token(&self) -> Result<AccessToken, AuthError> {
		let endpoint = self.config.token_endpoint();
		tracing::debug!(endpoint = %endpoint, "requesting access token");

		let response = self
			.http_client
			.post(&endpoint)
			.header("Accept", "application/json")
			.form(&[
				("grant_type", "client_credentials"),
				("client_id", self.config.client_id.as_str()),
				("client_secret", self.config.client_secret.expose().as_str()),
				("scope", self.config.scope.as_str()),
			])
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;

		if !status.is_success() {
			return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
				Ok(err) => AuthError::Rejected {
					status: status.as_u16(),
					error: err.error,
					description: err.error_description,
				},
				Err(_) => AuthError::Rejected {
					status: status.as_u16(),
					error: status.canonical_reason().unwrap_or("unknown").to_string(),
					description: (!body.is_empty()).then_some(body),
				},
			});
		}

		let token: AccessToken = serde_json::from_str(&body)
			.map_err(|e| AuthError::ParseError(format!("unexpected token response: {e}")))?;

		if token.token.is_blank() {
			return Err(AuthError::ParseError("empty access_token".to_string()));
		}
		if !token.token_type.eq_ignore_ascii_case("bearer") {
			return Err(AuthError::ParseError(format!(
				"unsupported token_type {:?}",
				token.token_type
			)));
		}

		Ok(token)
	}
}
