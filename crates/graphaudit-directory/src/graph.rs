// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! [`DirectoryClient`] over the Microsoft Graph v1.0 REST API.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use graphaudit_common_config::SecretString;
use graphaudit_common_http::{retry, RetryConfig};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::client::DirectoryClient;
use crate::error::DirectoryError;
use crate::odata::{
	DirectoryRoleRecord, MailboxSettingsRecord, ODataErrorEnvelope, ODataPage, RoleMemberRecord,
	UserRecord,
};
use crate::types::{AuditKind, MailboxPurpose, Principal, PrimaryAttribute};

/// OData error codes Graph uses for a user without a reachable mailbox.
const MAILBOX_NOT_FOUND_CODES: &[&str] = &[
	"MailboxNotEnabledForRESTAPI",
	"ErrorMailboxNotEnabled",
	"ErrorNonExistentMailbox",
	"ResourceNotFound",
	"Request_ResourceNotFound",
];

const USER_SELECT: &str = "id,displayName,userPrincipalName,assignedLicenses,accountEnabled";
const USER_PAGE_SIZE: &str = "999";

#[derive(Debug, Clone)]
pub struct GraphDirectoryClient {
	http_client: reqwest::Client,
	base_url: Url,
	token: SecretString,
	retry_config: RetryConfig,
}

impl GraphDirectoryClient {
	/// `base_url` is the versioned Graph root, e.g. `https://graph.microsoft.com/v1.0`.
	pub fn new(
		base_url: &str,
		token: SecretString,
		http_client: reqwest::Client,
	) -> Result<Self, DirectoryError> {
		let base_url =
			Url::parse(base_url).map_err(|e| DirectoryError::InvalidUrl(format!("{base_url}: {e}")))?;
		if base_url.cannot_be_a_base() {
			return Err(DirectoryError::InvalidUrl(base_url.to_string()));
		}
		Ok(Self {
			http_client,
			base_url,
			token,
			retry_config: RetryConfig::default(),
		})
	}

	pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
		self.retry_config = retry_config;
		self
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url, DirectoryError> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| DirectoryError::InvalidUrl(self.base_url.to_string()))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	/// Follow `@odata.nextLink` until the collection is exhausted.
	pub(crate) async fn fetch_all_pages<T: DeserializeOwned>(
		&self,
		first: Url,
		resource: &str,
	) -> Result<Vec<T>, DirectoryError> {
		let mut items = Vec::new();
		let mut visited: HashSet<Url> = HashSet::new();
		let mut next = Some(first);

		while let Some(url) = next.take() {
			let page: ODataPage<T> = self.get_json(&url, resource).await?;
			visited.insert(url);
			items.extend(page.value);

			if let Some(link) = page.next_link {
				let link = Url::parse(&link)
					.map_err(|e| DirectoryError::InvalidUrl(format!("{link}: {e}")))?;
				if visited.contains(&link) {
					return Err(DirectoryError::Decode(format!(
						"{resource}: nextLink revisits {link}"
					)));
				}
				next = Some(link);
			}
		}

		debug!(resource, pages = visited.len(), items = items.len(), "collection fetched");
		Ok(items)
	}

	async fn get_json<T: DeserializeOwned>(
		&self,
		url: &Url,
		resource: &str,
	) -> Result<T, DirectoryError> {
		retry(&self.retry_config, resource, || self.get_once(url, resource)).await
	}

	async fn get_once<T: DeserializeOwned>(
		&self,
		url: &Url,
		resource: &str,
	) -> Result<T, DirectoryError> {
		let response = self
			.http_client
			.get(url.clone())
			.bearer_auth(self.token.expose())
			.header(ACCEPT, "application/json")
			.send()
			.await
			.map_err(transport_error)?;

		let status = response.status();
		if status.is_success() {
			let body = response.text().await.map_err(transport_error)?;
			return serde_json::from_str(&body)
				.map_err(|e| DirectoryError::Decode(format!("{resource}: {e}")));
		}

		let retry_after = parse_retry_after(response.headers());
		let body = response.text().await.unwrap_or_default();
		Err(classify_failure(status, retry_after, &body, resource))
	}

	async fn fetch_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
		let mut url = self.endpoint(&["users"])?;
		url.query_pairs_mut()
			.append_pair("$select", USER_SELECT)
			.append_pair("$top", USER_PAGE_SIZE);
		self.fetch_all_pages(url, "users").await
	}

	/// Users holding any directory role, with the roles aggregated per user.
	async fn fetch_role_holders(&self) -> Result<Vec<Principal>, DirectoryError> {
		let roles: Vec<DirectoryRoleRecord> = self
			.fetch_all_pages(self.endpoint(&["directoryRoles"])?, "directoryRoles")
			.await?;

		let mut principals: Vec<Principal> = Vec::new();
		let mut index: HashMap<String, usize> = HashMap::new();

		for role in &roles {
			let members: Vec<RoleMemberRecord> = self
				.fetch_all_pages(
					self.endpoint(&["directoryRoles", &role.id, "members"])?,
					"directoryRoles/members",
				)
				.await?;

			for member in members.into_iter().filter(RoleMemberRecord::is_user) {
				if let Some(&i) = index.get(&member.id) {
					if let PrimaryAttribute::DirectoryRoles { roles } = &mut principals[i].primary {
						if !roles.contains(&role.display_name) {
							roles.push(role.display_name.clone());
						}
					}
					continue;
				}

				let upn = member.user_principal_name.ok_or_else(|| {
					DirectoryError::Decode(format!(
						"member {} of role {} has no userPrincipalName",
						member.id, role.display_name
					))
				})?;
				index.insert(member.id.clone(), principals.len());
				principals.push(Principal {
					id: member.id,
					user_principal_name: upn,
					display_name: member.display_name,
					primary: PrimaryAttribute::DirectoryRoles {
						roles: vec![role.display_name.clone()],
					},
				});
			}
		}

		debug!(roles = roles.len(), holders = principals.len(), "role holders collected");
		Ok(principals)
	}
}

#[async_trait]
impl DirectoryClient for GraphDirectoryClient {
	#[instrument(skip(self), name = "GraphDirectoryClient::fetch_principals", fields(audit = %audit))]
	async fn fetch_principals(&self, audit: AuditKind) -> Result<Vec<Principal>, DirectoryError> {
		match audit {
			AuditKind::AdminRoles => self.fetch_role_holders().await,
			AuditKind::Licenses => Ok(self
				.fetch_users()
				.await?
				.into_iter()
				.filter(|u| !u.assigned_licenses.is_empty())
				.map(|u| Principal {
					id: u.id,
					user_principal_name: u.user_principal_name,
					display_name: u.display_name,
					primary: PrimaryAttribute::Licenses {
						sku_ids: u.assigned_licenses.into_iter().map(|l| l.sku_id).collect(),
					},
				})
				.collect()),
			AuditKind::SignInEnabled => Ok(self
				.fetch_users()
				.await?
				.into_iter()
				.filter(|u| u.account_enabled == Some(true))
				.map(|u| Principal {
					id: u.id,
					user_principal_name: u.user_principal_name,
					display_name: u.display_name,
					primary: PrimaryAttribute::SignIn {
						account_enabled: true,
					},
				})
				.collect()),
		}
	}

	#[instrument(
		skip(self, principal),
		name = "GraphDirectoryClient::fetch_mailbox_purpose",
		fields(upn = %principal.user_principal_name)
	)]
	async fn fetch_mailbox_purpose(
		&self,
		principal: &Principal,
	) -> Result<Option<MailboxPurpose>, DirectoryError> {
		let url = self.endpoint(&["users", &principal.id, "mailboxSettings"])?;
		let resource = format!("mailboxSettings for {}", principal.user_principal_name);
		let settings: MailboxSettingsRecord = self.get_json(&url, &resource).await?;
		Ok(settings.user_purpose)
	}
}

fn transport_error(err: reqwest::Error) -> DirectoryError {
	if err.is_timeout() {
		DirectoryError::Timeout
	} else {
		DirectoryError::Transport(err)
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	headers
		.get(RETRY_AFTER)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse::<u64>().ok())
		.map(Duration::from_secs)
}

/// Map a non-2xx Graph response onto [`DirectoryError`].
pub(crate) fn classify_failure(
	status: StatusCode,
	retry_after: Option<Duration>,
	body: &str,
	resource: &str,
) -> DirectoryError {
	let odata = serde_json::from_str::<ODataErrorEnvelope>(body).ok();
	let code = odata.as_ref().map(|e| e.error.code.as_str());

	if status == StatusCode::NOT_FOUND
		|| code.is_some_and(|c| MAILBOX_NOT_FOUND_CODES.contains(&c))
	{
		return DirectoryError::NotFound {
			resource: resource.to_string(),
		};
	}

	if status == StatusCode::TOO_MANY_REQUESTS {
		return DirectoryError::RateLimited { retry_after };
	}

	match odata {
		Some(env) => DirectoryError::Status {
			status: status.as_u16(),
			code: Some(env.error.code),
			message: env.error.message,
		},
		None => DirectoryError::Status {
			status: status.as_u16(),
			code: None,
			message: if body.is_empty() {
				status.canonical_reason().unwrap_or("unknown").to_string()
			} else {
				body.to_string()
			},
		},
	}
}
