//! Document types and the versioned snapshot handed out by stores.
//!
//! A document's `status` is an aggregate of its signers' statuses, recomputed
//! after every signer transition by [`crate::aggregate`]. The only statuses
//! that do not come from aggregation are `drafted` (not yet sent) and
//! `expired` (set by an external, time-based process).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  identity::Identity,
  signer::{NewSigner, Signer},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Aggregate document status.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DocumentStatus {
  Drafted,
  Waiting,
  Signed,
  Declined,
  Expired,
}

impl DocumentStatus {
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .parse::<Self>()
      .map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  /// No signer action can change a document in a terminal status.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Signed | Self::Declined | Self::Expired)
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub document_id:   Uuid,
  pub name:          String,
  /// When `true`, signers act one rank at a time in `order` sequence.
  pub send_in_order: bool,
  pub status:        DocumentStatus,
  /// Insertion order carries no meaning; `Signer::order` does.
  pub signers:       Vec<Signer>,
  pub created_by:    Identity,
  pub created_at:    DateTime<Utc>,
}

impl Document {
  pub fn signer(&self, signer_id: Uuid) -> Option<&Signer> {
    self.signers.iter().find(|s| s.signer_id == signer_id)
  }

  pub fn signer_mut(&mut self, signer_id: Uuid) -> Option<&mut Signer> {
    self.signers.iter_mut().find(|s| s.signer_id == signer_id)
  }
}

// ─── NewDocument ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::DocumentStore::create_document`].
/// Ids, timestamps and statuses are always set by the store; new documents
/// start out `drafted` with every signer `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
  pub name:          String,
  #[serde(default)]
  pub send_in_order: bool,
  #[serde(default)]
  pub signers:       Vec<NewSigner>,
  pub created_by:    Identity,
}

impl NewDocument {
  pub fn new(name: impl Into<String>, created_by: Identity) -> Self {
    Self {
      name: name.into(),
      send_in_order: false,
      signers: Vec::new(),
      created_by,
    }
  }

  pub fn in_order(mut self) -> Self {
    self.send_in_order = true;
    self
  }

  pub fn signer(mut self, signer: NewSigner) -> Self {
    self.signers.push(signer);
    self
  }
}

// ─── Versioned ───────────────────────────────────────────────────────────────

/// A value read from a store together with its optimistic-concurrency token.
///
/// The token is opaque to callers except that it changes on every committed
/// write to the same document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
  pub version: u64,
  #[serde(flatten)]
  pub value:   T,
}
