// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::types::{AuditKind, MailboxPurpose, Principal};

/// Source of principals and mailbox settings.
///
/// Implemented over Graph by [`GraphDirectoryClient`](crate::GraphDirectoryClient);
/// tests substitute in-memory fakes.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
	/// Every principal carrying the primary attribute for `audit`, each
	/// exactly once.
	async fn fetch_principals(&self, audit: AuditKind) -> Result<Vec<Principal>, DirectoryError>;

	/// The principal's `userPurpose`. `Ok(None)` means the mailbox exists but
	/// reports no purpose; a missing mailbox is [`DirectoryError::NotFound`].
	async fn fetch_mailbox_purpose(
		&self,
		principal: &Principal,
	) -> Result<Option<MailboxPurpose>, DirectoryError>;
}
