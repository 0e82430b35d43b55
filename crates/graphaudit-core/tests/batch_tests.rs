// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphaudit_core::{
	run_batch, BatchError, BoundedEnricher, EnrichmentError, OutputFormat, Reporter,
};
use graphaudit_directory::{
	AuditKind, DirectoryClient, DirectoryError, MailboxPurpose, Principal, PrimaryAttribute,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy)]
enum Lookup {
	Purpose(Option<MailboxPurpose>),
	NoMailbox,
	ServerError,
}

/// In-memory directory that records how many lookups ran and how many
/// overlapped.
#[derive(Default)]
struct FakeDirectory {
	principals: Vec<Principal>,
	lookups: HashMap<String, Lookup>,
	primary_fails: bool,
	calls: AtomicUsize,
	in_flight: AtomicUsize,
	peak: AtomicUsize,
}

impl FakeDirectory {
	fn with(mut self, principal: Principal, lookup: Lookup) -> Self {
		self.lookups.insert(principal.id.clone(), lookup);
		self.principals.push(principal);
		self
	}

	fn failing_primary() -> Self {
		Self {
			primary_fails: true,
			..Self::default()
		}
	}
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
	async fn fetch_principals(&self, _audit: AuditKind) -> Result<Vec<Principal>, DirectoryError> {
		if self.primary_fails {
			return Err(DirectoryError::Status {
				status: 503,
				code: None,
				message: "Service Unavailable".to_string(),
			});
		}
		Ok(self.principals.clone())
	}

	async fn fetch_mailbox_purpose(
		&self,
		principal: &Principal,
	) -> Result<Option<MailboxPurpose>, DirectoryError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
		tokio::time::sleep(Duration::from_millis(2)).await;
		self.in_flight.fetch_sub(1, Ordering::SeqCst);

		match self.lookups.get(&principal.id) {
			Some(Lookup::Purpose(purpose)) => Ok(*purpose),
			Some(Lookup::NoMailbox) | None => Err(DirectoryError::NotFound {
				resource: format!("mailboxSettings for {}", principal.user_principal_name),
			}),
			Some(Lookup::ServerError) => Err(DirectoryError::Status {
				status: 500,
				code: Some("generalException".to_string()),
				message: "General error".to_string(),
			}),
		}
	}
}

fn role_holder(id: &str, upn: &str) -> Principal {
	Principal::new(
		id,
		upn,
		PrimaryAttribute::DirectoryRoles {
			roles: vec!["Global Administrator".to_string()],
		},
	)
}

fn licensed(id: &str, upn: &str) -> Principal {
	Principal::new(
		id,
		upn,
		PrimaryAttribute::Licenses {
			sku_ids: vec!["sku-e3".to_string()],
		},
	)
}

fn upns(report: &graphaudit_core::BatchReport) -> Vec<String> {
	report
		.matches
		.iter()
		.map(|m| m.user_principal_name().to_string())
		.collect()
}

#[tokio::test]
async fn shared_admin_is_reported() {
	let directory = FakeDirectory::default().with(
		role_holder("u-alice", "alice@contoso.com"),
		Lookup::Purpose(Some(MailboxPurpose::Shared)),
	);

	let report = run_batch(
		Arc::new(directory),
		AuditKind::AdminRoles,
		&BoundedEnricher::default(),
		&CancellationToken::new(),
	)
	.await
	.unwrap();

	assert_eq!(upns(&report), vec!["alice@contoso.com"]);
	assert_eq!(report.principals, 1);
	assert!(report.failures.is_empty());
}

#[tokio::test]
async fn regular_mailbox_yields_explicit_no_matches() {
	let directory = FakeDirectory::default().with(
		licensed("u-bob", "bob@contoso.com"),
		Lookup::Purpose(Some(MailboxPurpose::User)),
	);

	let report = run_batch(
		Arc::new(directory),
		AuditKind::Licenses,
		&BoundedEnricher::default(),
		&CancellationToken::new(),
	)
	.await
	.unwrap();
	assert!(report.matches.is_empty());

	let mut out = Vec::new();
	let mut diag = Vec::new();
	Reporter::new(OutputFormat::Text)
		.write_to(&report, &mut out, &mut diag)
		.unwrap();
	assert_eq!(String::from_utf8(out).unwrap(), "no matches\n");
}

#[tokio::test]
async fn missing_mailbox_is_counted_not_fatal() {
	let directory = FakeDirectory::default().with(
		role_holder("u-carol", "carol@contoso.com"),
		Lookup::NoMailbox,
	);

	let report = run_batch(
		Arc::new(directory),
		AuditKind::AdminRoles,
		&BoundedEnricher::default(),
		&CancellationToken::new(),
	)
	.await
	.unwrap();

	assert!(report.matches.is_empty());
	assert_eq!(report.failures.total(), 1);
	assert_eq!(report.failures.not_found, 1);
	assert_eq!(report.failures.failed[0].error, EnrichmentError::NotFound);
}

#[tokio::test]
async fn primary_fetch_failure_skips_enrichment() {
	let directory = Arc::new(FakeDirectory::failing_primary());
	let client: Arc<dyn DirectoryClient> = directory.clone();

	let err = run_batch(
		client,
		AuditKind::AdminRoles,
		&BoundedEnricher::default(),
		&CancellationToken::new(),
	)
	.await
	.unwrap_err();

	assert!(matches!(err, BatchError::PrimaryFetch(_)));
	assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
}

fn mixed_directory(n: usize) -> FakeDirectory {
	(0..n).fold(FakeDirectory::default(), |dir, i| {
		let lookup = match i % 4 {
			0 => Lookup::Purpose(Some(MailboxPurpose::Shared)),
			1 => Lookup::Purpose(Some(MailboxPurpose::User)),
			2 => Lookup::NoMailbox,
			_ => Lookup::ServerError,
		};
		dir.with(
			licensed(&format!("u{i}"), &format!("user{i}@contoso.com")),
			lookup,
		)
	})
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sequential_and_concurrent_runs_agree() {
	let sequential = Arc::new(mixed_directory(30));
	let concurrent = Arc::new(mixed_directory(30));
	let cancel = CancellationToken::new();

	let one = run_batch(
		sequential.clone(),
		AuditKind::Licenses,
		&BoundedEnricher::new(1),
		&cancel,
	)
	.await
	.unwrap();
	let ten = run_batch(
		concurrent.clone(),
		AuditKind::Licenses,
		&BoundedEnricher::new(10),
		&cancel,
	)
	.await
	.unwrap();

	assert_eq!(one, ten);
	assert_eq!(one.matches.len(), 8);
	assert_eq!(
		(one.failures.not_found, one.failures.upstream),
		(7, 7)
	);
	assert_eq!(sequential.peak.load(Ordering::SeqCst), 1);
	assert!(concurrent.peak.load(Ordering::SeqCst) <= 10);
	assert_eq!(concurrent.calls.load(Ordering::SeqCst), 30);
}

#[tokio::test]
async fn rerunning_against_unchanged_directory_is_idempotent() {
	let directory: Arc<dyn DirectoryClient> = Arc::new(mixed_directory(12));
	let enricher = BoundedEnricher::new(4);
	let cancel = CancellationToken::new();

	let first = run_batch(directory.clone(), AuditKind::Licenses, &enricher, &cancel)
		.await
		.unwrap();
	let second = run_batch(directory, AuditKind::Licenses, &enricher, &cancel)
		.await
		.unwrap();
	assert_eq!(upns(&first), upns(&second));
	assert_eq!(first, second);
}

#[tokio::test]
async fn cancelled_token_aborts_before_primary_fetch() {
	let cancel = CancellationToken::new();
	cancel.cancel();

	let err = run_batch(
		Arc::new(mixed_directory(3)),
		AuditKind::Licenses,
		&BoundedEnricher::default(),
		&cancel,
	)
	.await
	.unwrap_err();
	assert!(matches!(err, BatchError::Cancelled));
}

#[tokio::test]
async fn admin_audit_ignores_principals_without_roles() {
	let directory = FakeDirectory::default()
		.with(
			role_holder("u-ops", "ops@contoso.com"),
			Lookup::Purpose(Some(MailboxPurpose::Shared)),
		)
		.with(
			Principal::new(
				"u-none",
				"norole@contoso.com",
				PrimaryAttribute::DirectoryRoles { roles: Vec::new() },
			),
			Lookup::Purpose(Some(MailboxPurpose::Shared)),
		);

	let report = run_batch(
		Arc::new(directory),
		AuditKind::AdminRoles,
		&BoundedEnricher::new(2),
		&CancellationToken::new(),
	)
	.await
	.unwrap();
	assert_eq!(upns(&report), vec!["ops@contoso.com"]);
}
