//! Signer types: the parties whose actions drive a document's workflow.
//!
//! A signer moves exactly once from "not yet acted" to a terminal state
//! (`signed` or `declined`). Whether a signer may act *now* is never stored;
//! it is derived by [`crate::permissions`] from the current snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result, identity::Identity};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Per-signer status.
///
/// `Pending` and `Waiting` both mean "has not yet acted". Only `Pending` is
/// ever stored; `Waiting` is the display status of a signer blocked by an
/// earlier signer in an ordered document.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SignerStatus {
  #[default]
  Pending,
  Waiting,
  Signed,
  Declined,
}

impl SignerStatus {
  /// Parse a free-form status string and normalise it.
  ///
  /// This is the single ingestion point for textual statuses: both
  /// `"pending"` and `"waiting"` (any case) become [`SignerStatus::Pending`].
  pub fn parse_canonical(s: &str) -> Result<Self> {
    s.trim()
      .parse::<Self>()
      .map(Self::canonical)
      .map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  /// Collapse the "not yet acted" synonyms onto `Pending`.
  pub fn canonical(self) -> Self {
    match self {
      Self::Waiting => Self::Pending,
      other => other,
    }
  }

  /// `true` for `Pending` and `Waiting`.
  pub fn is_open(self) -> bool { matches!(self, Self::Pending | Self::Waiting) }

  /// `true` for `Signed` and `Declined`; no transition leaves these.
  pub fn is_terminal(self) -> bool { !self.is_open() }
}

// ─── Signer ──────────────────────────────────────────────────────────────────

/// One party to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
  pub signer_id:      Uuid,
  /// Account identity in the external backend, if the signer has one.
  pub user_id:        Option<String>,
  pub name:           String,
  /// Fallback matching key when no `user_id` matches (public signing links).
  pub email:          String,
  /// 1-based position in the signing sequence. Only consulted when the
  /// document is sent in order; gaps are allowed.
  pub order:          Option<u32>,
  pub status:         SignerStatus,
  /// Set exactly once, on the transition into `signed`.
  pub signed_at:      Option<DateTime<Utc>>,
  /// Set exactly once, on the transition into `declined`.
  pub declined_at:    Option<DateTime<Utc>>,
  pub decline_reason: Option<String>,
}

impl Signer {
  /// The identity this signer can be matched against.
  pub fn identity(&self) -> Identity {
    Identity {
      user_id: self.user_id.clone(),
      email:   Some(self.email.clone()),
    }
  }

  /// Return the signer with its stored status normalised.
  pub fn canonical(mut self) -> Self {
    self.status = self.status.canonical();
    self
  }
}

// ─── NewSigner ───────────────────────────────────────────────────────────────

/// Input for a signer on [`crate::document::NewDocument`].
/// Status and timestamps are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSigner {
  #[serde(default)]
  pub user_id: Option<String>,
  pub name:    String,
  pub email:   String,
  #[serde(default)]
  pub order:   Option<u32>,
}

impl NewSigner {
  /// Convenience constructor for a signer without an account identity.
  pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      user_id: None,
      name:    name.into(),
      email:   email.into(),
      order:   None,
    }
  }

  pub fn with_order(mut self, order: u32) -> Self {
    self.order = Some(order);
    self
  }

  pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
    self.user_id = Some(user_id.into());
    self
  }

  /// Materialise a pending [`Signer`] with the given id.
  pub fn into_signer(self, signer_id: Uuid) -> Signer {
    Signer {
      signer_id,
      user_id: self.user_id,
      name: self.name,
      email: self.email,
      order: self.order,
      status: SignerStatus::Pending,
      signed_at: None,
      declined_at: None,
      decline_reason: None,
    }
  }
}
