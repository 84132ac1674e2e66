//! Snapshot builders shared by the unit tests in this crate.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::{
  document::{Document, DocumentStatus},
  identity::Identity,
  signer::{Signer, SignerStatus},
};

pub fn signer(order: Option<u32>, status: SignerStatus) -> Signer {
  let signer_id = Uuid::new_v4();
  Signer {
    signer_id,
    user_id: None,
    name: format!("Signer {}", order.unwrap_or_default()),
    email: format!("{signer_id}@example.com"),
    order,
    status,
    signed_at: None,
    declined_at: None,
    decline_reason: None,
  }
}

/// Pending signers with the given orders.
pub fn pending(orders: &[u32]) -> Vec<Signer> {
  orders
    .iter()
    .map(|&o| signer(Some(o), SignerStatus::Pending))
    .collect()
}

pub fn document(
  send_in_order: bool,
  status: DocumentStatus,
  signers: Vec<Signer>,
) -> Document {
  Document {
    document_id: Uuid::new_v4(),
    name: "Lease agreement".into(),
    send_in_order,
    status,
    signers,
    created_by: Identity::user("creator").with_email("owner@example.com"),
    created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
  }
}
