//! Actor authorization: may this identity act on this document right now?
//!
//! Every check fails closed. Creator suppression is a separate predicate
//! ([`is_creator`]) so callers can compose either policy; [`CreatorPolicy`]
//! names the two compositions the workflow supports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  aggregate::aggregate_status,
  document::{Document, DocumentStatus},
  identity::Identity,
  permissions::permission_for,
  signer::{Signer, SignerStatus},
};

/// Why an actor may not act. These are expected business outcomes, not
/// faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
  #[error("document is {status}, not waiting for signatures")]
  DocumentNotInWaitingState { status: DocumentStatus },

  #[error("actor is not a signer of this document")]
  ActorNotASigner,

  #[error("signer has already {status}")]
  SignerAlreadyActed { status: SignerStatus },

  #[error("an earlier signer has not signed yet")]
  BlockedByPredecessor,

  #[error("the document creator may not act on this document")]
  CreatorBarred,
}

impl Denial {
  /// Stable snake_case code, matching the serialised `reason` tag.
  pub fn code(&self) -> &'static str {
    match self {
      Self::DocumentNotInWaitingState { .. } => "document_not_in_waiting_state",
      Self::ActorNotASigner => "actor_not_a_signer",
      Self::SignerAlreadyActed { .. } => "signer_already_acted",
      Self::BlockedByPredecessor => "blocked_by_predecessor",
      Self::CreatorBarred => "creator_barred",
    }
  }
}

/// How the creator rule composes with signer eligibility.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CreatorPolicy {
  /// A creator who is also a listed signer signs like any other signer.
  #[default]
  AllowListedSigner,
  /// Creating a document bars the creator from acting on it.
  Bar,
}

/// Find the signer an actor refers to: a `user_id` match wins; otherwise the
/// first signer whose email equals the actor's.
pub fn resolve_signer<'a>(
  signers: &'a [Signer],
  actor: &Identity,
) -> Option<&'a Signer> {
  signers
    .iter()
    .find(|s| actor.same_user(&s.identity()))
    .or_else(|| signers.iter().find(|s| actor.same_email(&s.identity())))
}

/// Check that `actor` may sign or decline `document` now, returning the
/// signer record they act as.
pub fn authorize<'a>(
  document: &'a Document,
  actor: &Identity,
) -> Result<&'a Signer, Denial> {
  let aggregate = aggregate_status(&document.signers);
  if document.status != DocumentStatus::Waiting {
    return Err(Denial::DocumentNotInWaitingState { status: document.status });
  }
  if aggregate != DocumentStatus::Waiting {
    return Err(Denial::DocumentNotInWaitingState { status: aggregate });
  }

  let signer =
    resolve_signer(&document.signers, actor).ok_or(Denial::ActorNotASigner)?;

  if signer.status.is_terminal() {
    return Err(Denial::SignerAlreadyActed { status: signer.status });
  }

  let permitted = permission_for(
    &document.signers,
    document.send_in_order,
    signer.signer_id,
  )
  .is_some_and(|p| p.can_sign);
  if !permitted {
    return Err(Denial::BlockedByPredecessor);
  }

  Ok(signer)
}

/// [`authorize`] under a creator policy.
pub fn authorize_with_policy<'a>(
  document: &'a Document,
  actor: &Identity,
  policy: CreatorPolicy,
) -> Result<&'a Signer, Denial> {
  if policy == CreatorPolicy::Bar && is_creator(document, actor) {
    return Err(Denial::CreatorBarred);
  }
  authorize(document, actor)
}

pub fn can_user_act(document: &Document, actor: &Identity) -> bool {
  authorize(document, actor).is_ok()
}

/// Whether `actor` is the identity that created `document`.
pub fn is_creator(document: &Document, actor: &Identity) -> bool {
  document.created_by.matches(actor)
}

/// Whether a UI should show a "Sign" affordance: the actor may act and is
/// not the document's creator.
pub fn offers_sign_action(document: &Document, actor: &Identity) -> bool {
  can_user_act(document, actor) && !is_creator(document, actor)
}
