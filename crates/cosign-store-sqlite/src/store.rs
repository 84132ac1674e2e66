//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use cosign_core::{
  document::{Document, DocumentStatus, NewDocument, Versioned},
  signer::Signer,
  store::{CommitOutcome, DocumentStore},
};

use crate::{
  encode::{
    RawDocument, RawSigner, decode_signer_status, decode_uuid,
    encode_document_status, encode_dt, encode_signer_status, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

const DOCUMENT_COLUMNS: &str = "document_id, name, send_in_order, status,
  created_by_user_id, created_by_email, created_at, version";

const SIGNER_COLUMNS: &str = "signer_id, document_id, user_id, name, email,
  signing_order, status, signed_at, declined_at, decline_reason";

fn raw_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDocument> {
  Ok(RawDocument {
    document_id:        row.get(0)?,
    name:               row.get(1)?,
    send_in_order:      row.get(2)?,
    status:             row.get(3)?,
    created_by_user_id: row.get(4)?,
    created_by_email:   row.get(5)?,
    created_at:         row.get(6)?,
    version:            row.get(7)?,
  })
}

fn raw_signer(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSigner> {
  Ok(RawSigner {
    signer_id:      row.get(0)?,
    document_id:    row.get(1)?,
    user_id:        row.get(2)?,
    name:           row.get(3)?,
    email:          row.get(4)?,
    signing_order:  row.get(5)?,
    status:         row.get(6)?,
    signed_at:      row.get(7)?,
    declined_at:    row.get(8)?,
    decline_reason: row.get(9)?,
  })
}

/// Which signer rows to read.
enum SignerScope<'a> {
  Document(&'a str),
  DocumentsWithStatus(&'a str),
  All,
}

/// Read signer rows for `scope`, in insertion order.
fn query_signers(
  conn: &rusqlite::Connection,
  scope: SignerScope<'_>,
) -> rusqlite::Result<Vec<RawSigner>> {
  match scope {
    SignerScope::Document(id) => {
      let mut stmt = conn.prepare(&format!(
        "SELECT {SIGNER_COLUMNS} FROM signers WHERE document_id = ?1 ORDER BY position"
      ))?;
      stmt
        .query_map(rusqlite::params![id], raw_signer)?
        .collect()
    }
    SignerScope::DocumentsWithStatus(status) => {
      let mut stmt = conn.prepare(&format!(
        "SELECT {SIGNER_COLUMNS} FROM signers
         WHERE document_id IN (SELECT document_id FROM documents WHERE status = ?1)
         ORDER BY document_id, position"
      ))?;
      stmt
        .query_map(rusqlite::params![status], raw_signer)?
        .collect()
    }
    SignerScope::All => {
      let mut stmt = conn.prepare(&format!(
        "SELECT {SIGNER_COLUMNS} FROM signers ORDER BY document_id, position"
      ))?;
      stmt.query_map([], raw_signer)?.collect()
    }
  }
}

/// What the commit transaction observed, before mapping into domain types.
enum RawCommit {
  Committed(i64),
  Conflict(i64),
  Missing,
  ForeignSigner(String),
  SignerSettled(String, String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cosign document store backed by a single SQLite file.
///
/// The inner connection is reference-counted, so clones share it.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn create_document(&self, input: NewDocument) -> Result<Versioned<Document>> {
    let document = Document {
      document_id:   Uuid::new_v4(),
      name:          input.name,
      send_in_order: input.send_in_order,
      status:        DocumentStatus::Drafted,
      signers:       input
        .signers
        .into_iter()
        .map(|s| s.into_signer(Uuid::new_v4()))
        .collect(),
      created_by:    input.created_by,
      created_at:    Utc::now(),
    };

    let doc_id_str  = encode_uuid(document.document_id);
    let name        = document.name.clone();
    let in_order    = document.send_in_order;
    let status_str  = encode_document_status(document.status);
    let by_user     = document.created_by.user_id.clone();
    let by_email    = document.created_by.email.clone();
    let at_str      = encode_dt(document.created_at);
    let signer_rows: Vec<(String, Option<String>, String, String, Option<u32>, &'static str)> =
      document
        .signers
        .iter()
        .map(|s| {
          (
            encode_uuid(s.signer_id),
            s.user_id.clone(),
            s.name.clone(),
            s.email.clone(),
            s.order,
            encode_signer_status(s.status),
          )
        })
        .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO documents (
             document_id, name, send_in_order, status,
             created_by_user_id, created_by_email, created_at, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
          rusqlite::params![
            doc_id_str, name, in_order, status_str, by_user, by_email, at_str,
          ],
        )?;
        for (position, (signer_id, user_id, name, email, order, status)) in
          signer_rows.into_iter().enumerate()
        {
          tx.execute(
            "INSERT INTO signers (
               signer_id, document_id, position, user_id, name, email,
               signing_order, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
              signer_id,
              doc_id_str,
              position as i64,
              user_id,
              name,
              email,
              order,
              status,
            ],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      document_id = %document.document_id,
      signers = document.signers.len(),
      "document created"
    );
    Ok(Versioned { version: 1, value: document })
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Versioned<Document>>> {
    let id_str = encode_uuid(id);

    // Document row and signer rows are read in one call so the version
    // matches the signers it is returned with.
    let raw: Option<(RawDocument, Vec<RawSigner>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let doc = tx
          .query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1"),
            rusqlite::params![id_str],
            raw_document,
          )
          .optional()?;
        let Some(doc) = doc else { return Ok(None) };
        let signers = query_signers(&tx, SignerScope::Document(&id_str))?;
        Ok(Some((doc, signers)))
      })
      .await?;

    let Some((raw, raw_signers)) = raw else { return Ok(None) };

    let signers = raw_signers
      .into_iter()
      .map(RawSigner::into_signer)
      .collect::<Result<Vec<_>>>()?;

    raw.into_document(signers).map(Some)
  }

  async fn list_documents(
    &self,
    status: Option<DocumentStatus>,
  ) -> Result<Vec<Versioned<Document>>> {
    let status_str = status.map(encode_document_status);

    let (raws, raw_signers): (Vec<RawDocument>, Vec<RawSigner>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let (docs, signers) = if let Some(st) = status_str {
          let mut stmt = tx.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE status = ?1 ORDER BY created_at"
          ))?;
          let docs = stmt
            .query_map(rusqlite::params![st], raw_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          (docs, query_signers(&tx, SignerScope::DocumentsWithStatus(st))?)
        } else {
          let mut stmt = tx.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at"
          ))?;
          let docs = stmt
            .query_map([], raw_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          (docs, query_signers(&tx, SignerScope::All)?)
        };
        Ok((docs, signers))
      })
      .await?;

    let mut by_document: HashMap<String, Vec<Signer>> = HashMap::new();
    for raw in raw_signers {
      let key = raw.document_id.clone();
      by_document.entry(key).or_default().push(raw.into_signer()?);
    }

    raws
      .into_iter()
      .map(|raw| {
        let signers = by_document.remove(&raw.document_id).unwrap_or_default();
        raw.into_document(signers)
      })
      .collect()
  }

  async fn commit<'a>(
    &'a self,
    document: &'a Document,
    expected_version: u64,
  ) -> Result<CommitOutcome> {
    let doc_id_str = encode_uuid(document.document_id);
    let status_str = encode_document_status(document.status);
    let expected   = expected_version as i64;
    let signer_rows: Vec<(String, &'static str, Option<String>, Option<String>, Option<String>)> =
      document
        .signers
        .iter()
        .map(|s| {
          (
            encode_uuid(s.signer_id),
            encode_signer_status(s.status),
            s.signed_at.map(encode_dt),
            s.declined_at.map(encode_dt),
            s.decline_reason.clone(),
          )
        })
        .collect();

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let updated = tx.execute(
          "UPDATE documents SET status = ?1, version = version + 1
           WHERE document_id = ?2 AND version = ?3",
          rusqlite::params![status_str, doc_id_str, expected],
        )?;

        if updated == 0 {
          let current: Option<i64> = tx
            .query_row(
              "SELECT version FROM documents WHERE document_id = ?1",
              rusqlite::params![doc_id_str],
              |r| r.get(0),
            )
            .optional()?;
          // Dropping `tx` rolls back.
          return Ok(current.map_or(RawCommit::Missing, RawCommit::Conflict));
        }

        for (signer_id, status, signed_at, declined_at, reason) in signer_rows {
          // Signed and declined rows are final; only a same-status rewrite
          // touches them. `signed_at` / `declined_at` are only written while
          // still NULL.
          let touched = tx.execute(
            "UPDATE signers SET
               status         = ?1,
               signed_at      = COALESCE(signed_at, ?2),
               declined_at    = COALESCE(declined_at, ?3),
               decline_reason = COALESCE(decline_reason, ?4)
             WHERE signer_id = ?5 AND document_id = ?6
               AND (status = ?1 OR status IN ('pending', 'waiting'))",
            rusqlite::params![
              status, signed_at, declined_at, reason, signer_id, doc_id_str,
            ],
          )?;
          if touched == 0 {
            let stored: Option<String> = tx
              .query_row(
                "SELECT status FROM signers WHERE signer_id = ?1 AND document_id = ?2",
                rusqlite::params![signer_id, doc_id_str],
                |r| r.get(0),
              )
              .optional()?;
            return Ok(match stored {
              Some(stored) => RawCommit::SignerSettled(signer_id, stored),
              None => RawCommit::ForeignSigner(signer_id),
            });
          }
        }

        tx.commit()?;
        Ok(RawCommit::Committed(expected + 1))
      })
      .await?;

    match raw {
      RawCommit::Committed(v) => Ok(CommitOutcome::Committed { version: v as u64 }),
      RawCommit::Conflict(v) => Ok(CommitOutcome::Conflict { current: v as u64 }),
      RawCommit::Missing => Err(Error::DocumentNotFound(document.document_id)),
      RawCommit::ForeignSigner(signer_id) => Err(Error::ForeignSigner {
        document_id: document.document_id,
        signer_id:   decode_uuid(&signer_id)?,
      }),
      RawCommit::SignerSettled(signer_id, stored) => Err(Error::SignerSettled {
        signer_id: decode_uuid(&signer_id)?,
        status:    decode_signer_status(&stored)?,
      }),
    }
  }
}
