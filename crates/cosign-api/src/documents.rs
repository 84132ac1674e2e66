//! Handlers for `/documents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/documents` | Optional `?status=drafted\|waiting\|signed\|declined\|expired` |
//! | `POST` | `/documents` | Body: [`NewDocument`]; returns 201 + [`DocumentView`] |
//! | `GET`  | `/documents/:id` | [`DocumentView`] with `ETag` |
//! | `POST` | `/documents/:id/send` | `drafted` → `waiting` |
//! | `POST` | `/documents/:id/expire` | Marks a non-terminal document `expired` |
//! | `GET`  | `/documents/:id/access` | `?user_id=...&email=...` → [`AccessReport`] |
//! | `POST` | `/documents/:id/sign` | Body: `{"actor":{...}}`; honours `If-Match` |
//! | `POST` | `/documents/:id/decline` | Body: `{"actor":{...},"reason":"..."}`; honours `If-Match` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use cosign_core::{
  aggregate::is_complete,
  authorize::{
    Denial, authorize_with_policy, is_creator, offers_sign_action,
    resolve_signer,
  },
  document::{Document, DocumentStatus, NewDocument, Versioned},
  identity::Identity,
  permissions::{SignerPermission, compute_permissions, permission_for},
  store::DocumentStore,
  transition::Action,
  workflow::{self, Outcome},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  etag::{compute_etag, if_match_satisfied},
};

// ─── Views ────────────────────────────────────────────────────────────────────

/// A document as served by the API: the stored snapshot plus the derived
/// permissions for every signer.
#[derive(Debug, Serialize)]
pub struct DocumentView {
  pub version:     u64,
  #[serde(flatten)]
  pub document:    Document,
  pub permissions: Vec<SignerPermission>,
  /// `true` once the signers alone have settled the document.
  pub complete:    bool,
}

impl From<Versioned<Document>> for DocumentView {
  fn from(v: Versioned<Document>) -> Self {
    let permissions =
      compute_permissions(&v.value.signers, v.value.send_in_order);
    let complete = is_complete(&v.value.signers);
    Self { version: v.version, document: v.value, permissions, complete }
  }
}

impl From<Outcome> for DocumentView {
  fn from(o: Outcome) -> Self {
    Self {
      version:     o.document.version,
      complete:    is_complete(&o.document.value.signers),
      document:    o.document.value,
      permissions: o.permissions,
    }
  }
}

/// Respond with a view and its `ETag`.
fn view_response(status: StatusCode, doc: Versioned<Document>) -> Response {
  let etag = compute_etag(&doc);
  (status, [(header::ETAG, etag)], Json(DocumentView::from(doc))).into_response()
}

fn outcome_response(outcome: Outcome) -> Response {
  let etag = compute_etag(&outcome.document);
  (StatusCode::OK, [(header::ETAG, etag)], Json(DocumentView::from(outcome)))
    .into_response()
}

async fn load<S>(store: &S, id: Uuid) -> Result<Versioned<Document>, ApiError>
where
  S: DocumentStore,
{
  store
    .get_document(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<DocumentStatus>,
}

/// `GET /documents[?status=<status>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DocumentView>>, ApiError>
where
  S: DocumentStore,
{
  let docs = state
    .store
    .list_documents(params.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(docs.into_iter().map(DocumentView::from).collect()))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /documents`: returns 201 and the drafted document.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewDocument>,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("document name is required".into()));
  }
  if body.created_by.is_empty() {
    return Err(ApiError::BadRequest("created_by needs a user_id or email".into()));
  }
  if body.signers.iter().any(|s| s.order == Some(0)) {
    return Err(ApiError::BadRequest("signer order is 1-based".into()));
  }

  let doc = state
    .store
    .create_document(body)
    .await
    .map_err(ApiError::store)?;
  Ok(view_response(StatusCode::CREATED, doc))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /documents/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  let doc = load(state.store.as_ref(), id).await?;
  Ok(view_response(StatusCode::OK, doc))
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

/// `POST /documents/:id/send`
pub async fn send<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  let outcome = workflow::send(state.store.as_ref(), id, &state.options).await?;
  Ok(outcome_response(outcome))
}

/// `POST /documents/:id/expire`
pub async fn expire<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  let outcome =
    workflow::expire(state.store.as_ref(), id, &state.options).await?;
  Ok(outcome_response(outcome))
}

// ─── Access ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AccessParams {
  pub user_id: Option<String>,
  pub email:   Option<String>,
}

/// What a given actor may do with a document right now.
#[derive(Debug, Serialize)]
pub struct AccessReport {
  pub can_act:            bool,
  pub denial:             Option<Denial>,
  pub signer_id:          Option<Uuid>,
  pub permission:         Option<SignerPermission>,
  pub is_creator:         bool,
  /// `can_act` and not the creator: whether to show a "Sign" button.
  pub offers_sign_action: bool,
}

/// `GET /documents/:id/access?user_id=...&email=...`
pub async fn access<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<AccessParams>,
) -> Result<Json<AccessReport>, ApiError>
where
  S: DocumentStore,
{
  let actor = Identity { user_id: params.user_id, email: params.email };
  if actor.is_empty() {
    return Err(ApiError::BadRequest("user_id or email is required".into()));
  }

  let doc = load(state.store.as_ref(), id).await?.value;
  let decision =
    authorize_with_policy(&doc, &actor, state.options.creator_policy);
  let signer_id = resolve_signer(&doc.signers, &actor).map(|s| s.signer_id);

  Ok(Json(AccessReport {
    can_act:            decision.is_ok(),
    denial:             decision.err(),
    signer_id,
    permission:         signer_id.and_then(|sid| {
      permission_for(&doc.signers, doc.send_in_order, sid)
    }),
    is_creator:         is_creator(&doc, &actor),
    offers_sign_action: offers_sign_action(&doc, &actor),
  }))
}

// ─── Sign / decline ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignBody {
  pub actor: Identity,
}

#[derive(Debug, Deserialize)]
pub struct DeclineBody {
  pub actor:  Identity,
  pub reason: Option<String>,
}

/// The raw `If-Match` header, if the client sent one.
fn if_match_header(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
  headers
    .get(header::IF_MATCH)
    .map(|v| {
      v.to_str()
        .map_err(|_| ApiError::BadRequest("invalid If-Match header".into()))
    })
    .transpose()
}

async fn act<S>(
  state: &AppState<S>,
  id: Uuid,
  headers: &HeaderMap,
  actor: Identity,
  action: Action,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  if actor.is_empty() {
    return Err(ApiError::BadRequest("actor needs a user_id or email".into()));
  }
  let if_match = if_match_header(headers)?;

  // Checked against every snapshot the workflow loads, so a write that lands
  // after the client's read fails with 412 instead of being retried over.
  let outcome = workflow::act_if(
    state.store.as_ref(),
    id,
    &actor,
    action,
    &state.options,
    |snapshot| {
      if_match.is_none_or(|m| if_match_satisfied(m, &compute_etag(snapshot)))
    },
  )
  .await?;
  Ok(outcome_response(outcome))
}

/// `POST /documents/:id/sign`
pub async fn sign<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<SignBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  act(&state, id, &headers, body.actor, Action::Sign).await
}

/// `POST /documents/:id/decline`
pub async fn decline<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(body): Json<DeclineBody>,
) -> Result<Response, ApiError>
where
  S: DocumentStore,
{
  act(&state, id, &headers, body.actor, Action::Decline {
    reason: body.reason,
  })
  .await
}
