//! SQL schema for the Cosign SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- `version` is the optimistic-concurrency token: every commit bumps it and
-- is guarded by `WHERE version = <version read>`.
CREATE TABLE IF NOT EXISTS documents (
    document_id        TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    send_in_order      INTEGER NOT NULL,  -- 0 | 1
    status             TEXT NOT NULL,     -- 'drafted' | 'waiting' | 'signed' | 'declined' | 'expired'
    created_by_user_id TEXT,
    created_by_email   TEXT,
    created_at         TEXT NOT NULL,     -- ISO 8601 UTC; server-assigned
    version            INTEGER NOT NULL DEFAULT 1
);

-- Identity columns are written once at creation; only the status columns
-- are ever updated.
CREATE TABLE IF NOT EXISTS signers (
    signer_id      TEXT PRIMARY KEY,
    document_id    TEXT NOT NULL REFERENCES documents(document_id),
    position       INTEGER NOT NULL,      -- insertion order, for stable output
    user_id        TEXT,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL,
    signing_order  INTEGER,
    status         TEXT NOT NULL DEFAULT 'pending',
    signed_at      TEXT,
    declined_at    TEXT,
    decline_reason TEXT,
    UNIQUE (document_id, position)
);

CREATE INDEX IF NOT EXISTS signers_document_idx ON signers(document_id);
CREATE INDEX IF NOT EXISTS documents_status_idx ON documents(status);

PRAGMA user_version = 1;
";
