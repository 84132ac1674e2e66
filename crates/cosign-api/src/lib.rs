//! JSON REST API for Cosign.
//!
//! Exposes an axum [`Router`] backed by any
//! [`cosign_core::store::DocumentStore`]. Resolving *who* the actor is
//! (sessions, tokens) is the caller's responsibility; handlers take the
//! actor's identity explicitly in the request.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", cosign_api::api_router(state))
//! ```

pub mod documents;
pub mod error;
pub mod etag;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use cosign_core::{
  authorize::CreatorPolicy, store::DocumentStore, workflow::WorkflowOptions,
};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `COSIGN_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Full read-check-write rounds before a contended action gives up.
  #[serde(default = "default_max_commit_attempts")]
  pub max_commit_attempts: u32,
  #[serde(default)]
  pub creator_policy:      CreatorPolicy,
}

fn default_max_commit_attempts() -> u32 {
  WorkflowOptions::default().max_attempts
}

impl ServerConfig {
  pub fn workflow_options(&self) -> WorkflowOptions {
    WorkflowOptions {
      max_attempts:   self.max_commit_attempts,
      creator_policy: self.creator_policy,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub options: WorkflowOptions,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), options: self.options }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: DocumentStore + 'static,
{
  Router::new()
    .route(
      "/documents",
      get(documents::list::<S>).post(documents::create::<S>),
    )
    .route("/documents/{id}", get(documents::get_one::<S>))
    .route("/documents/{id}/send", post(documents::send::<S>))
    .route("/documents/{id}/expire", post(documents::expire::<S>))
    .route("/documents/{id}/access", get(documents::access::<S>))
    .route("/documents/{id}/sign", post(documents::sign::<S>))
    .route("/documents/{id}/decline", post(documents::decline::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
