// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Graph wire records.
//!
//! Only the fields the audits read are declared. A declared field that is
//! missing from a response fails decoding; fields that Graph may legitimately
//! return as `null` are marked with [`required_nullable`].

use serde::{Deserialize, Deserializer};

use crate::types::MailboxPurpose;

pub(crate) const USER_ODATA_TYPE: &str = "#microsoft.graph.user";

/// One page of an OData collection.
#[derive(Debug, Deserialize)]
pub(crate) struct ODataPage<T> {
	pub value: Vec<T>,
	#[serde(rename = "@odata.nextLink", default)]
	pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ODataErrorEnvelope {
	pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ODataErrorBody {
	pub code: String,
	#[serde(default)]
	pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DirectoryRoleRecord {
	pub id: String,
	pub display_name: String,
}

/// A member of a directory role. Members may be users, groups or service
/// principals; only users carry a UPN.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RoleMemberRecord {
	#[serde(rename = "@odata.type")]
	pub odata_type: String,
	pub id: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub user_principal_name: Option<String>,
}

impl RoleMemberRecord {
	pub fn is_user(&self) -> bool {
		self.odata_type == USER_ODATA_TYPE
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserRecord {
	pub id: String,
	pub user_principal_name: String,
	#[serde(default)]
	pub display_name: Option<String>,
	pub assigned_licenses: Vec<AssignedLicenseRecord>,
	#[serde(deserialize_with = "required_nullable")]
	pub account_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignedLicenseRecord {
	pub sku_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MailboxSettingsRecord {
	#[serde(deserialize_with = "required_nullable")]
	pub user_purpose: Option<MailboxPurpose>,
}

/// The field must be present, but may be `null`.
pub(crate) fn required_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer)
}
