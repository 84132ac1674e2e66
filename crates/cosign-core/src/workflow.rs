//! Workflow driver: read → check → apply → aggregate → commit, retried as a
//! whole on conflict.
//!
//! Every operation here loads a fresh snapshot, runs the pure engine over it,
//! and commits against the version it read. A conflicting commit means the
//! snapshot was stale, so the *entire* sequence runs again: a signer who was
//! eligible a moment ago may be blocked or finished now.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  aggregate::aggregate_status,
  authorize::{CreatorPolicy, Denial, authorize_with_policy},
  document::{Document, DocumentStatus, Versioned},
  identity::Identity,
  permissions::{SignerPermission, compute_permissions},
  store::{CommitOutcome, DocumentStore},
  transition::{Action, TransitionError, apply_action},
};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
  /// How many full read-check-write rounds to attempt before giving up.
  pub max_attempts:   u32,
  pub creator_policy: CreatorPolicy,
}

impl Default for WorkflowOptions {
  fn default() -> Self {
    Self {
      max_attempts:   5,
      creator_policy: CreatorPolicy::default(),
    }
  }
}

// ─── Outcome / errors ────────────────────────────────────────────────────────

/// The committed document and the permissions recomputed from it, so callers
/// can show the next signer's "your turn" state.
#[derive(Debug, Clone)]
pub struct Outcome {
  pub document:    Versioned<Document>,
  pub permissions: Vec<SignerPermission>,
}

#[derive(Debug, Error)]
pub enum WorkflowError<E> {
  #[error("store error: {0}")]
  Store(#[source] E),

  #[error("document not found: {0}")]
  NotFound(Uuid),

  #[error(transparent)]
  Denied(#[from] Denial),

  #[error(transparent)]
  Invalid(#[from] crate::Error),

  #[error("gave up after {attempts} conflicting commits")]
  Contention { attempts: u32 },

  /// The caller's precondition rejected the stored snapshot.
  #[error("document changed (now at version {current})")]
  PreconditionFailed { current: u64 },
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Have `actor` sign or decline document `id`.
pub async fn act<S: DocumentStore>(
  store: &S,
  id: Uuid,
  actor: &Identity,
  action: Action,
  opts: &WorkflowOptions,
) -> Result<Outcome, WorkflowError<S::Error>> {
  act_if(store, id, actor, action, opts, any_snapshot).await
}

/// Like [`act`], but only against a snapshot that `precondition` accepts.
///
/// The precondition is re-evaluated on every reload, so a write that lands
/// between the caller's read and this commit yields
/// [`WorkflowError::PreconditionFailed`] instead of a retry.
pub async fn act_if<S, P>(
  store: &S,
  id: Uuid,
  actor: &Identity,
  action: Action,
  opts: &WorkflowOptions,
  precondition: P,
) -> Result<Outcome, WorkflowError<S::Error>>
where
  S: DocumentStore,
  P: Fn(&Versioned<Document>) -> bool + Send + Sync,
{
  let outcome = commit_with_retry(store, id, opts, &precondition, |document| {
    let signer_id =
      authorize_with_policy(document, actor, opts.creator_policy)
        .inspect_err(|denial| {
          tracing::debug!(document_id = %id, reason = denial.code(), "action denied");
        })?
        .signer_id;

    let signer = document
      .signer_mut(signer_id)
      .ok_or(crate::Error::SignerNotFound(signer_id))?;
    apply_action(signer, action.clone(), Utc::now()).map_err(
      |TransitionError::AlreadyActed(status)| Denial::SignerAlreadyActed {
        status,
      },
    )?;

    document.status = aggregate_status(&document.signers);
    Ok(())
  })
  .await?;

  tracing::info!(
    document_id = %id,
    signer_status = %action.target(),
    document_status = %outcome.document.value.status,
    "signer action committed"
  );
  Ok(outcome)
}

/// Send a drafted document out for signature.
pub async fn send<S: DocumentStore>(
  store: &S,
  id: Uuid,
  opts: &WorkflowOptions,
) -> Result<Outcome, WorkflowError<S::Error>> {
  commit_with_retry(store, id, opts, &any_snapshot, |document| {
    if document.status != DocumentStatus::Drafted {
      return Err(
        crate::Error::InvalidTransition {
          from: document.status,
          to:   DocumentStatus::Waiting,
        }
        .into(),
      );
    }
    if document.signers.is_empty() {
      return Err(crate::Error::NoSigners.into());
    }
    document.status = aggregate_status(&document.signers);
    Ok(())
  })
  .await
}

/// Mark a document expired. Only non-terminal documents can expire.
pub async fn expire<S: DocumentStore>(
  store: &S,
  id: Uuid,
  opts: &WorkflowOptions,
) -> Result<Outcome, WorkflowError<S::Error>> {
  commit_with_retry(store, id, opts, &any_snapshot, |document| {
    if document.status.is_terminal() {
      return Err(
        crate::Error::InvalidTransition {
          from: document.status,
          to:   DocumentStatus::Expired,
        }
        .into(),
      );
    }
    document.status = DocumentStatus::Expired;
    Ok(())
  })
  .await
}

// ─── Retry loop ──────────────────────────────────────────────────────────────

fn any_snapshot(_: &Versioned<Document>) -> bool { true }

async fn commit_with_retry<S, P, F>(
  store: &S,
  id: Uuid,
  opts: &WorkflowOptions,
  precondition: &P,
  mut step: F,
) -> Result<Outcome, WorkflowError<S::Error>>
where
  S: DocumentStore,
  P: Fn(&Versioned<Document>) -> bool + Sync,
  F: FnMut(&mut Document) -> Result<(), WorkflowError<S::Error>> + Send,
{
  let attempts = opts.max_attempts.max(1);

  for attempt in 1..=attempts {
    let snapshot = store
      .get_document(id)
      .await
      .map_err(WorkflowError::Store)?
      .ok_or(WorkflowError::NotFound(id))?;

    if !precondition(&snapshot) {
      tracing::debug!(
        document_id = %id,
        current = snapshot.version,
        "precondition failed"
      );
      return Err(WorkflowError::PreconditionFailed {
        current: snapshot.version,
      });
    }

    let Versioned { version, value: mut document } = snapshot;

    step(&mut document)?;

    match store
      .commit(&document, version)
      .await
      .map_err(WorkflowError::Store)?
    {
      CommitOutcome::Committed { version } => {
        let permissions =
          compute_permissions(&document.signers, document.send_in_order);
        return Ok(Outcome {
          document: Versioned { version, value: document },
          permissions,
        });
      }
      CommitOutcome::Conflict { current } => {
        tracing::debug!(
          document_id = %id,
          attempt,
          expected = version,
          current,
          "commit conflict, reloading snapshot"
        );
      }
    }
  }

  tracing::warn!(document_id = %id, attempts, "giving up after repeated conflicts");
  Err(WorkflowError::Contention { attempts })
}
