// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Directory access for graphaudit.
//!
//! A batch starts with a *primary fetch*: every user carrying one attribute
//! (a directory role, an assigned license, an enabled account). Each of those
//! principals is then looked up individually for its mailbox settings. Both
//! calls sit behind [`DirectoryClient`] so the batch engine can run against
//! Graph or against an in-memory fake.
//!
//! | Audit | Primary fetch |
//! |-------|---------------|
//! | [`AuditKind::AdminRoles`] | `GET /directoryRoles`, then `GET /directoryRoles/{id}/members` per role |
//! | [`AuditKind::Licenses`] | `GET /users?$select=...` filtered to non-empty `assignedLicenses` |
//! | [`AuditKind::SignInEnabled`] | `GET /users?$select=...` filtered to `accountEnabled` |
//!
//! Mailbox settings come from `GET /users/{id}/mailboxSettings`.

mod client;
pub mod error;
mod graph;
mod odata;
pub mod types;

pub use client::DirectoryClient;
pub use error::DirectoryError;
pub use graph::GraphDirectoryClient;
pub use types::{AuditKind, MailboxPurpose, Principal, PrimaryAttribute, UnknownPurpose};
