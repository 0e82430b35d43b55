// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit kinds, principals and mailbox purposes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which primary attribute a batch audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditKind {
	/// Principals that are members of one or more directory roles.
	AdminRoles,
	/// Principals with at least one assigned license.
	Licenses,
	/// Principals whose account allows interactive sign-in.
	SignInEnabled,
}

impl AuditKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditKind::AdminRoles => "admin-roles",
			AuditKind::Licenses => "licenses",
			AuditKind::SignInEnabled => "sign-in-enabled",
		}
	}

	/// Whether `principal` carries this audit's primary attribute.
	///
	/// A principal fetched for a different audit never qualifies.
	pub fn primary_attribute_present(&self, principal: &Principal) -> bool {
		match (self, &principal.primary) {
			(AuditKind::AdminRoles, PrimaryAttribute::DirectoryRoles { roles }) => !roles.is_empty(),
			(AuditKind::Licenses, PrimaryAttribute::Licenses { sku_ids }) => !sku_ids.is_empty(),
			(AuditKind::SignInEnabled, PrimaryAttribute::SignIn { account_enabled }) => {
				*account_enabled
			}
			_ => false,
		}
	}
}

impl fmt::Display for AuditKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The attribute that put a principal into the primary set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimaryAttribute {
	/// Display names of the roles the principal holds.
	DirectoryRoles { roles: Vec<String> },
	/// SKU identifiers of the assigned licenses.
	Licenses { sku_ids: Vec<String> },
	SignIn { account_enabled: bool },
}

/// A directory user returned by a primary fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	/// Graph object id.
	pub id: String,
	pub user_principal_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	pub primary: PrimaryAttribute,
}

impl Principal {
	pub fn new(
		id: impl Into<String>,
		user_principal_name: impl Into<String>,
		primary: PrimaryAttribute,
	) -> Self {
		Self {
			id: id.into(),
			user_principal_name: user_principal_name.into(),
			display_name: None,
			primary,
		}
	}
}

/// Value of `mailboxSettings.userPurpose`.
///
/// Graph spells these in camelCase; parsing ignores case. Any value outside
/// this set is a decode error rather than a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailboxPurpose {
	User,
	Linked,
	Shared,
	Room,
	Equipment,
	Others,
	UnknownFutureValue,
}

impl MailboxPurpose {
	pub fn as_str(&self) -> &'static str {
		match self {
			MailboxPurpose::User => "user",
			MailboxPurpose::Linked => "linked",
			MailboxPurpose::Shared => "shared",
			MailboxPurpose::Room => "room",
			MailboxPurpose::Equipment => "equipment",
			MailboxPurpose::Others => "others",
			MailboxPurpose::UnknownFutureValue => "unknownFutureValue",
		}
	}

	pub fn is_shared(&self) -> bool {
		matches!(self, MailboxPurpose::Shared)
	}
}

impl fmt::Display for MailboxPurpose {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized mailbox purpose {0:?}")]
pub struct UnknownPurpose(pub String);

impl FromStr for MailboxPurpose {
	type Err = UnknownPurpose;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		const ALL: [MailboxPurpose; 7] = [
			MailboxPurpose::User,
			MailboxPurpose::Linked,
			MailboxPurpose::Shared,
			MailboxPurpose::Room,
			MailboxPurpose::Equipment,
			MailboxPurpose::Others,
			MailboxPurpose::UnknownFutureValue,
		];
		ALL.into_iter()
			.find(|p| p.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| UnknownPurpose(s.to_string()))
	}
}

impl Serialize for MailboxPurpose {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for MailboxPurpose {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}
