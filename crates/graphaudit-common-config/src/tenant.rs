// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant credentials and endpoints.
//!
//! # Environment
//!
//! | Variable                              | Field           |
//! |---------------------------------------|-----------------|
//! | `TENANT_ID`                           | `tenant_id`     |
//! | `CLIENT_ID`                           | `client_id`     |
//! | `CLIENT_SECRET` / `CLIENT_SECRET_FILE` | `client_secret` |
//!
//! Endpoints default to the Azure public cloud and can be overridden for
//! sovereign clouds or tests.

use thiserror::Error;

use crate::env::RequiredSecretError;
use crate::secret::SecretString;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error(transparent)]
	Secret(#[from] RequiredSecretError),
}

/// Everything needed to authenticate against one tenant and call Graph.
#[derive(Debug, Clone)]
pub struct TenantConfig {
	pub tenant_id: String,
	pub client_id: String,
	pub client_secret: SecretString,
	/// Identity platform host, without the tenant path segment.
	pub authority_host: String,
	/// Graph root including the API version, e.g. `https://graph.microsoft.com/v1.0`.
	pub graph_base_url: String,
	pub scope: String,
}

impl TenantConfig {
	pub fn new(
		tenant_id: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: SecretString,
	) -> Self {
		Self {
			tenant_id: tenant_id.into(),
			client_id: client_id.into(),
			client_secret,
			authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
			graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
			scope: DEFAULT_GRAPH_SCOPE.to_string(),
		}
	}

	pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
		self.authority_host = host.into();
		self
	}

	pub fn with_graph_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.graph_base_url = base_url.into();
		self
	}

	/// `{authority_host}/{tenant_id}/oauth2/v2.0/token`
	pub fn token_endpoint(&self) -> String {
		format!(
			"{}/{}/oauth2/v2.0/token",
			self.authority_host.trim_end_matches('/'),
			self.tenant_id
		)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.tenant_id.trim().is_empty() {
			return Err(ConfigError::InvalidConfig(
				"tenant_id cannot be empty".to_string(),
			));
		}
		if self.tenant_id.contains(['/', '?', '#']) {
			return Err(ConfigError::InvalidConfig(format!(
				"tenant_id contains URL delimiters: {}",
				self.tenant_id
			)));
		}
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::InvalidConfig(
				"client_id cannot be empty".to_string(),
			));
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::InvalidConfig(
				"client_secret cannot be empty".to_string(),
			));
		}
		for (name, url) in [
			("authority_host", &self.authority_host),
			("graph_base_url", &self.graph_base_url),
		] {
			if !(url.starts_with("https://") || url.starts_with("http://")) {
				return Err(ConfigError::InvalidConfig(format!(
					"{name} must be an http(s) URL, got {url:?}"
				)));
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> TenantConfig {
		TenantConfig::new(
			"contoso.onmicrosoft.com",
			"00000000-0000-0000-0000-000000000001",
			SecretString::new("s3cr3t".to_string()),
		)
	}

	#[test]
	fn defaults_point_at_public_cloud() {
		let config = config();
		assert_eq!(config.graph_base_url, DEFAULT_GRAPH_BASE_URL);
		assert_eq!(config.scope, DEFAULT_GRAPH_SCOPE);
		assert_eq!(
			config.token_endpoint(),
			"https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
	}

	#[test]
	fn token_endpoint_tolerates_trailing_slash() {
		let config = config().with_authority_host("http://127.0.0.1:9000/");
		assert_eq!(
			config.token_endpoint(),
			"http://127.0.0.1:9000/contoso.onmicrosoft.com/oauth2/v2.0/token"
		);
	}

	#[test]
	fn valid_config_passes() {
		assert!(config().validate().is_ok());
	}

	#[test]
	fn empty_fields_are_rejected() {
		let mut c = config();
		c.tenant_id = " ".to_string();
		assert!(matches!(c.validate(), Err(ConfigError::InvalidConfig(_))));

		let mut c = config();
		c.client_id = String::new();
		assert!(matches!(c.validate(), Err(ConfigError::InvalidConfig(_))));

		let mut c = config();
		c.client_secret = SecretString::new(String::new());
		assert!(matches!(c.validate(), Err(ConfigError::InvalidConfig(_))));
	}

	#[test]
	fn tenant_with_path_delimiters_is_rejected() {
		let mut c = config();
		c.tenant_id = "contoso/../common".to_string();
		assert!(c.validate().is_err());
	}

	#[test]
	fn non_http_endpoints_are_rejected() {
		let c = config().with_graph_base_url("graph.microsoft.com/v1.0");
		assert!(c.validate().is_err());
	}

	#[test]
	fn debug_output_hides_client_secret() {
		let rendered = format!("{:?}", config());
		assert!(!rendered.contains("s3cr3t"));
		assert!(rendered.contains("[REDACTED]"));
	}
}
