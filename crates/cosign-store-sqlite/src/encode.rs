//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Statuses are stored as
//! lowercase text. UUIDs are stored as hyphenated lowercase strings.
//!
//! Signer statuses are normalised on the way in, so rows written by older
//! tooling with `'waiting'` read back as `pending`.

use chrono::{DateTime, Utc};
use cosign_core::{
  document::{Document, DocumentStatus, Versioned},
  identity::Identity,
  signer::{Signer, SignerStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Statuses ────────────────────────────────────────────────────────────────

pub fn encode_document_status(s: DocumentStatus) -> &'static str { s.into() }

pub fn decode_document_status(s: &str) -> Result<DocumentStatus> {
  Ok(DocumentStatus::parse(s)?)
}

pub fn encode_signer_status(s: SignerStatus) -> &'static str {
  s.canonical().into()
}

pub fn decode_signer_status(s: &str) -> Result<SignerStatus> {
  Ok(SignerStatus::parse_canonical(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub document_id:        String,
  pub name:               String,
  pub send_in_order:      bool,
  pub status:             String,
  pub created_by_user_id: Option<String>,
  pub created_by_email:   Option<String>,
  pub created_at:         String,
  pub version:            i64,
}

impl RawDocument {
  /// Assemble the document from its row and its (already decoded) signers.
  pub fn into_document(self, signers: Vec<Signer>) -> Result<Versioned<Document>> {
    Ok(Versioned {
      version: self.version as u64,
      value:   Document {
        document_id: decode_uuid(&self.document_id)?,
        name: self.name,
        send_in_order: self.send_in_order,
        status: decode_document_status(&self.status)?,
        signers,
        created_by: Identity {
          user_id: self.created_by_user_id,
          email:   self.created_by_email,
        },
        created_at: decode_dt(&self.created_at)?,
      },
    })
  }
}

/// Raw values read directly from a `signers` row.
pub struct RawSigner {
  pub signer_id:      String,
  pub document_id:    String,
  pub user_id:        Option<String>,
  pub name:           String,
  pub email:          String,
  pub signing_order:  Option<i64>,
  pub status:         String,
  pub signed_at:      Option<String>,
  pub declined_at:    Option<String>,
  pub decline_reason: Option<String>,
}

impl RawSigner {
  pub fn into_signer(self) -> Result<Signer> {
    Ok(Signer {
      signer_id:      decode_uuid(&self.signer_id)?,
      user_id:        self.user_id,
      name:           self.name,
      email:          self.email,
      order:          self.signing_order.map(|o| o as u32),
      status:         decode_signer_status(&self.status)?,
      signed_at:      decode_opt_dt(self.signed_at)?,
      declined_at:    decode_opt_dt(self.declined_at)?,
      decline_reason: self.decline_reason,
    })
  }
}
