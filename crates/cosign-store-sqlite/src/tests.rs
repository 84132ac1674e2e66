//! Integration tests for `SqliteStore` and the workflow driver against an
//! in-memory database.

use std::sync::atomic::{AtomicBool, Ordering};

use cosign_core::{
  authorize::{CreatorPolicy, Denial},
  document::{Document, DocumentStatus, NewDocument, Versioned},
  identity::Identity,
  signer::{NewSigner, SignerStatus},
  store::{CommitOutcome, DocumentStore},
  transition::Action,
  workflow::{self, WorkflowError, WorkflowOptions},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn creator() -> Identity { Identity::user("creator-1").with_email("owner@example.com") }

fn signer(n: u32) -> NewSigner {
  NewSigner::new(format!("Signer {n}"), format!("signer{n}@example.com"))
    .with_order(n)
}

fn as_signer(n: u32) -> Identity { Identity::email(format!("signer{n}@example.com")) }

/// Four signers in order 1..=4, already sent.
async fn sent_in_order(s: &SqliteStore) -> Uuid {
  let input = NewDocument::new("Demo contract", creator())
    .in_order()
    .signer(signer(1))
    .signer(signer(2))
    .signer(signer(3))
    .signer(signer(4));
  let doc = s.create_document(input).await.unwrap();
  workflow::send(s, doc.value.document_id, &WorkflowOptions::default())
    .await
    .unwrap();
  doc.value.document_id
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_document() {
  let s = store().await;
  let input = NewDocument::new("NDA", creator())
    .signer(signer(2).with_user_id("u-2"))
    .signer(NewSigner::new("No order", "free@example.com"));

  let created = s.create_document(input).await.unwrap();
  assert_eq!(created.version, 1);
  assert_eq!(created.value.status, DocumentStatus::Drafted);

  let fetched = s
    .get_document(created.value.document_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.value.signers[0].user_id.as_deref(), Some("u-2"));
  assert_eq!(fetched.value.signers[0].order, Some(2));
  assert_eq!(fetched.value.signers[1].order, None);
  assert!(
    fetched
      .value
      .signers
      .iter()
      .all(|sg| sg.status == SignerStatus::Pending)
  );
}

#[tokio::test]
async fn get_document_missing_returns_none() {
  let s = store().await;
  assert!(s.get_document(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_documents_filtered_by_status() {
  let s = store().await;
  sent_in_order(&s).await;
  s.create_document(NewDocument::new("Draft", creator()))
    .await
    .unwrap();

  let all = s.list_documents(None).await.unwrap();
  assert_eq!(all.len(), 2);

  let waiting = s.list_documents(Some(DocumentStatus::Waiting)).await.unwrap();
  assert_eq!(waiting.len(), 1);
  assert_eq!(waiting[0].value.signers.len(), 4);

  let drafts = s.list_documents(Some(DocumentStatus::Drafted)).await.unwrap();
  assert_eq!(drafts.len(), 1);
  assert!(drafts[0].value.signers.is_empty());
}

#[tokio::test]
async fn filtered_list_keeps_signers_with_their_document() {
  let s = store().await;
  let waiting = sent_in_order(&s).await;
  let draft = s
    .create_document(
      NewDocument::new("Draft", creator())
        .signer(NewSigner::new("Drafted signer", "draft@example.com")),
    )
    .await
    .unwrap();

  let listed = s.list_documents(Some(DocumentStatus::Drafted)).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].value.document_id, draft.value.document_id);
  let emails: Vec<&str> =
    listed[0].value.signers.iter().map(|sg| sg.email.as_str()).collect();
  assert_eq!(emails, vec!["draft@example.com"]);

  let listed = s.list_documents(Some(DocumentStatus::Waiting)).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].value.document_id, waiting);
  assert!(
    listed[0]
      .value
      .signers
      .iter()
      .all(|sg| sg.email.starts_with("signer"))
  );
}

#[tokio::test]
async fn unknown_stored_status_is_a_core_error() {
  let s = store().await;
  let id = sent_in_order(&s).await;
  let id_str = id.to_string();
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE signers SET status = 'archived' WHERE document_id = ?1",
        rusqlite::params![id_str],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.get_document(id).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(cosign_core::Error::UnknownStatus(ref st)) if st == "archived"
  ));
}

#[tokio::test]
async fn stale_commit_conflicts_and_writes_nothing() {
  let s = store().await;
  let id = sent_in_order(&s).await;
  let snapshot = s.get_document(id).await.unwrap().unwrap();

  let mut first = snapshot.value.clone();
  first.signers[0].status = SignerStatus::Signed;
  let outcome = s.commit(&first, snapshot.version).await.unwrap();
  assert_eq!(outcome, CommitOutcome::Committed {
    version: snapshot.version + 1,
  });

  let mut second = snapshot.value.clone();
  second.signers[0].status = SignerStatus::Declined;
  second.status = DocumentStatus::Declined;
  let outcome = s.commit(&second, snapshot.version).await.unwrap();
  assert_eq!(outcome, CommitOutcome::Conflict {
    current: snapshot.version + 1,
  });

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.value.signers[0].status, SignerStatus::Signed);
  assert_eq!(stored.value.status, DocumentStatus::Waiting);
}

#[tokio::test]
async fn commit_unknown_document_errors() {
  let s = store().await;
  let id = sent_in_order(&s).await;
  let mut doc = s.get_document(id).await.unwrap().unwrap().value;
  doc.document_id = Uuid::new_v4();

  let err = s.commit(&doc, 1).await.unwrap_err();
  assert!(matches!(err, crate::Error::DocumentNotFound(_)));
}

#[tokio::test]
async fn commit_with_foreign_signer_is_rolled_back() {
  let s = store().await;
  let id = sent_in_order(&s).await;
  let snapshot = s.get_document(id).await.unwrap().unwrap();

  let mut doc = snapshot.value.clone();
  doc.status = DocumentStatus::Signed;
  doc.signers[3].signer_id = Uuid::new_v4();

  let err = s.commit(&doc, snapshot.version).await.unwrap_err();
  assert!(matches!(err, crate::Error::ForeignSigner { .. }));

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.version, snapshot.version);
  assert_eq!(stored.value.status, DocumentStatus::Waiting);
}

#[tokio::test]
async fn commit_cannot_reopen_a_settled_signer() {
  let s = store().await;
  let id = sent_in_order(&s).await;
  let out = workflow::act(&s, id, &as_signer(1), Action::Sign, &WorkflowOptions::default())
    .await
    .unwrap();

  let mut doc = out.document.value.clone();
  doc.signers[0].status = SignerStatus::Pending;
  doc.signers[0].signed_at = None;

  let err = s.commit(&doc, out.document.version).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::SignerSettled { status: SignerStatus::Signed, .. }
  ));

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.version, out.document.version);
  assert_eq!(stored.value.signers[0].status, SignerStatus::Signed);
  assert!(stored.value.signers[0].signed_at.is_some());
}

#[tokio::test]
async fn commit_may_rewrite_a_settled_signer_unchanged() {
  let s = store().await;
  let id = sent_in_order(&s).await;
  let out = workflow::act(&s, id, &as_signer(1), Action::Sign, &WorkflowOptions::default())
    .await
    .unwrap();

  let outcome = s
    .commit(&out.document.value, out.document.version)
    .await
    .unwrap();
  assert_eq!(outcome, CommitOutcome::Committed {
    version: out.document.version + 1,
  });
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_moves_drafted_to_waiting_once() {
  let s = store().await;
  let opts = WorkflowOptions::default();
  let doc = s
    .create_document(NewDocument::new("Offer", creator()).signer(signer(1)))
    .await
    .unwrap();
  let id = doc.value.document_id;

  let out = workflow::send(&s, id, &opts).await.unwrap();
  assert_eq!(out.document.value.status, DocumentStatus::Waiting);
  assert_eq!(out.document.version, 2);
  assert!(out.permissions[0].can_sign);

  let err = workflow::send(&s, id, &opts).await.unwrap_err();
  assert!(matches!(
    err,
    WorkflowError::Invalid(cosign_core::Error::InvalidTransition {
      from: DocumentStatus::Waiting,
      ..
    })
  ));
}

#[tokio::test]
async fn send_without_signers_is_rejected() {
  let s = store().await;
  let doc = s
    .create_document(NewDocument::new("Empty", creator()))
    .await
    .unwrap();
  let err = workflow::send(&s, doc.value.document_id, &WorkflowOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::Invalid(cosign_core::Error::NoSigners)));
}

#[tokio::test]
async fn four_signers_in_order_end_to_end() {
  let s = store().await;
  let opts = WorkflowOptions::default();
  let id = sent_in_order(&s).await;

  let doc = s.get_document(id).await.unwrap().unwrap();
  let eligible = cosign_core::permissions::eligible_signers(
    &doc.value.signers,
    doc.value.send_in_order,
  );
  assert_eq!(eligible, vec![doc.value.signers[0].signer_id]);

  // Signer 2 may not jump the queue.
  let err = workflow::act(&s, id, &as_signer(2), Action::Sign, &opts)
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::Denied(Denial::BlockedByPredecessor)));

  let out = workflow::act(&s, id, &as_signer(1), Action::Sign, &opts)
    .await
    .unwrap();
  assert_eq!(out.document.value.status, DocumentStatus::Waiting);
  let can: Vec<bool> = out.permissions.iter().map(|p| p.can_sign).collect();
  assert_eq!(can, vec![false, true, false, false]);
  assert_eq!(out.permissions[2].display_status, SignerStatus::Waiting);
  assert_eq!(out.permissions[3].display_status, SignerStatus::Waiting);
  assert!(out.document.value.signers[0].signed_at.is_some());

  for n in 2..=3 {
    let out = workflow::act(&s, id, &as_signer(n), Action::Sign, &opts)
      .await
      .unwrap();
    assert_eq!(out.document.value.status, DocumentStatus::Waiting);
  }

  let out = workflow::act(&s, id, &as_signer(4), Action::Sign, &opts)
    .await
    .unwrap();
  assert_eq!(out.document.value.status, DocumentStatus::Signed);
  assert!(out.permissions.iter().all(|p| !p.can_sign));

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.value.status, DocumentStatus::Signed);
  assert!(stored.value.signers.iter().all(|sg| sg.signed_at.is_some()));
}

#[tokio::test]
async fn decline_ends_the_document() {
  let s = store().await;
  let opts = WorkflowOptions::default();
  let id = sent_in_order(&s).await;

  let out = workflow::act(
    &s,
    id,
    &as_signer(1),
    Action::Decline { reason: Some("terms changed".into()) },
    &opts,
  )
  .await
  .unwrap();
  assert_eq!(out.document.value.status, DocumentStatus::Declined);
  assert!(!out.permissions[1].can_sign);

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(
    stored.value.signers[0].decline_reason.as_deref(),
    Some("terms changed")
  );
  assert!(stored.value.signers[0].declined_at.is_some());

  let err = workflow::act(&s, id, &as_signer(2), Action::Sign, &opts)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    WorkflowError::Denied(Denial::DocumentNotInWaitingState {
      status: DocumentStatus::Declined,
    })
  ));
}

#[tokio::test]
async fn creator_policy_is_applied() {
  let s = store().await;
  let input = NewDocument::new("Self-signed", creator())
    .signer(signer(1).with_user_id("creator-1"));
  let doc = s.create_document(input).await.unwrap();
  let id = doc.value.document_id;
  workflow::send(&s, id, &WorkflowOptions::default()).await.unwrap();

  let barred = WorkflowOptions {
    creator_policy: CreatorPolicy::Bar,
    ..WorkflowOptions::default()
  };
  let err = workflow::act(&s, id, &creator(), Action::Sign, &barred)
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::Denied(Denial::CreatorBarred)));

  let out = workflow::act(&s, id, &creator(), Action::Sign, &WorkflowOptions::default())
    .await
    .unwrap();
  assert_eq!(out.document.value.status, DocumentStatus::Signed);
}

#[tokio::test]
async fn expire_only_from_non_terminal() {
  let s = store().await;
  let opts = WorkflowOptions::default();
  let id = sent_in_order(&s).await;

  let out = workflow::expire(&s, id, &opts).await.unwrap();
  assert_eq!(out.document.value.status, DocumentStatus::Expired);

  let err = workflow::act(&s, id, &as_signer(1), Action::Sign, &opts)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    WorkflowError::Denied(Denial::DocumentNotInWaitingState {
      status: DocumentStatus::Expired,
    })
  ));

  let err = workflow::expire(&s, id, &opts).await.unwrap_err();
  assert!(matches!(err, WorkflowError::Invalid(_)));
}

#[tokio::test]
async fn act_on_missing_document_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = workflow::act(&s, id, &as_signer(1), Action::Sign, &WorkflowOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::NotFound(got) if got == id));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

/// Lets another writer commit first, once, right before the wrapped commit.
struct RacingStore {
  inner:  SqliteStore,
  rival:  fn(&mut Document),
  raced:  AtomicBool,
  always: bool,
}

impl RacingStore {
  fn new(inner: SqliteStore, rival: fn(&mut Document)) -> Self {
    Self { inner, rival, raced: AtomicBool::new(false), always: false }
  }
}

impl DocumentStore for RacingStore {
  type Error = crate::Error;

  async fn create_document(
    &self,
    input: NewDocument,
  ) -> crate::Result<Versioned<Document>> {
    self.inner.create_document(input).await
  }

  async fn get_document(
    &self,
    id: Uuid,
  ) -> crate::Result<Option<Versioned<Document>>> {
    self.inner.get_document(id).await
  }

  async fn list_documents(
    &self,
    status: Option<DocumentStatus>,
  ) -> crate::Result<Vec<Versioned<Document>>> {
    self.inner.list_documents(status).await
  }

  async fn commit<'a>(
    &'a self,
    document: &'a Document,
    expected_version: u64,
  ) -> crate::Result<CommitOutcome> {
    if self.always || !self.raced.swap(true, Ordering::SeqCst) {
      let current = self
        .inner
        .get_document(document.document_id)
        .await?
        .expect("document exists");
      let mut rival = current.value.clone();
      (self.rival)(&mut rival);
      self.inner.commit(&rival, current.version).await?;
    }
    self.inner.commit(document, expected_version).await
  }
}

#[tokio::test]
async fn conflict_reruns_the_whole_check() {
  let s = store().await;
  let input = NewDocument::new("Race", creator())
    .signer(signer(1))
    .signer(signer(2));
  let doc = s.create_document(input).await.unwrap();
  let id = doc.value.document_id;
  workflow::send(&s, id, &WorkflowOptions::default()).await.unwrap();

  // The rival declines as signer 2 while signer 1 is mid-flight.
  let racing = RacingStore::new(s.clone(), |doc| {
    doc.signers[1].status = SignerStatus::Declined;
    doc.status = DocumentStatus::Declined;
  });

  let err = workflow::act(&racing, id, &as_signer(1), Action::Sign, &WorkflowOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    WorkflowError::Denied(Denial::DocumentNotInWaitingState {
      status: DocumentStatus::Declined,
    })
  ));

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.value.signers[0].status, SignerStatus::Pending);
}

#[tokio::test]
async fn conflict_with_unrelated_write_succeeds_on_retry() {
  let s = store().await;
  let input = NewDocument::new("Race", creator())
    .signer(signer(1))
    .signer(signer(2))
    .signer(signer(3));
  let doc = s.create_document(input).await.unwrap();
  let id = doc.value.document_id;
  workflow::send(&s, id, &WorkflowOptions::default()).await.unwrap();

  // Unordered: signer 3 signing concurrently does not affect signer 1.
  let racing = RacingStore::new(s.clone(), |doc| {
    doc.signers[2].status = SignerStatus::Signed;
  });

  let out = workflow::act(&racing, id, &as_signer(1), Action::Sign, &WorkflowOptions::default())
    .await
    .unwrap();
  assert_eq!(out.document.version, 4);
  assert_eq!(out.document.value.signers[0].status, SignerStatus::Signed);
  assert_eq!(out.document.value.signers[2].status, SignerStatus::Signed);
  assert_eq!(out.document.value.status, DocumentStatus::Waiting);
}

#[tokio::test]
async fn endless_conflicts_give_up() {
  let s = store().await;
  let id = sent_in_order(&s).await;

  let mut racing = RacingStore::new(s.clone(), |_| {});
  racing.always = true;
  let opts = WorkflowOptions { max_attempts: 3, ..WorkflowOptions::default() };

  let err = workflow::act(&racing, id, &as_signer(1), Action::Sign, &opts)
    .await
    .unwrap_err();
  assert!(matches!(err, WorkflowError::Contention { attempts: 3 }));
}

#[tokio::test]
async fn precondition_is_rechecked_after_a_conflict() {
  let s = store().await;
  let input = NewDocument::new("Race", creator())
    .signer(signer(1))
    .signer(signer(2));
  let doc = s.create_document(input).await.unwrap();
  let id = doc.value.document_id;
  let sent = workflow::send(&s, id, &WorkflowOptions::default()).await.unwrap();
  let seen = sent.document.version;

  // Signer 2 signs between signer 1's read and commit. Signer 1 is still
  // eligible, but the snapshot signer 1 saw is gone.
  let racing = RacingStore::new(s.clone(), |doc| {
    doc.signers[1].status = SignerStatus::Signed;
  });

  let err = workflow::act_if(
    &racing,
    id,
    &as_signer(1),
    Action::Sign,
    &WorkflowOptions::default(),
    |snapshot| snapshot.version == seen,
  )
  .await
  .unwrap_err();
  assert!(matches!(
    err,
    WorkflowError::PreconditionFailed { current } if current == seen + 1
  ));

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.version, seen + 1);
  assert_eq!(stored.value.signers[0].status, SignerStatus::Pending);
  assert_eq!(stored.value.signers[1].status, SignerStatus::Signed);
}

#[tokio::test]
async fn precondition_failure_writes_nothing() {
  let s = store().await;
  let id = sent_in_order(&s).await;

  let err = workflow::act_if(
    &s,
    id,
    &as_signer(1),
    Action::Sign,
    &WorkflowOptions::default(),
    |_| false,
  )
  .await
  .unwrap_err();
  assert!(matches!(err, WorkflowError::PreconditionFailed { current: 2 }));

  let stored = s.get_document(id).await.unwrap().unwrap();
  assert_eq!(stored.value.signers[0].status, SignerStatus::Pending);
}
