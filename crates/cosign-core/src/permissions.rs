//! Signer permission calculator.
//!
//! Given a snapshot of a document's signers and its ordering policy, decides
//! for each signer whether they may act now and what status to display.
//! Pure: the same snapshot always yields the same permissions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  order::{Rank, frontier},
  signer::{Signer, SignerStatus},
};

/// The derived state of one signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerPermission {
  pub signer_id:      Uuid,
  pub can_sign:       bool,
  /// `pending` for a signer who may act, `waiting` for one blocked by an
  /// earlier signer, otherwise the stored terminal status.
  pub display_status: SignerStatus,
}

/// Compute permissions for every signer, in input order.
///
/// - Signers who already signed or declined can never act.
/// - Without ordering, every signer who has not acted may act.
/// - With ordering, a signer who has not acted may act iff every signer of a
///   strictly lower rank has *signed*. A decline earlier in the sequence
///   therefore keeps everyone after it blocked.
pub fn compute_permissions(
  signers: &[Signer],
  send_in_order: bool,
) -> Vec<SignerPermission> {
  let next = if send_in_order { frontier(signers) } else { None };

  signers
    .iter()
    .map(|signer| {
      let can_sign = signer.status.is_open()
        && (!send_in_order || next == Some(Rank::of(signer)));
      let display_status = match signer.status.canonical() {
        SignerStatus::Pending if can_sign => SignerStatus::Pending,
        SignerStatus::Pending => SignerStatus::Waiting,
        terminal => terminal,
      };
      SignerPermission { signer_id: signer.signer_id, can_sign, display_status }
    })
    .collect()
}

/// Permission for a single signer, or `None` if the id is not in the list.
pub fn permission_for(
  signers: &[Signer],
  send_in_order: bool,
  signer_id: Uuid,
) -> Option<SignerPermission> {
  compute_permissions(signers, send_in_order)
    .into_iter()
    .find(|p| p.signer_id == signer_id)
}

/// The signers whose turn it is.
pub fn eligible_signers(signers: &[Signer], send_in_order: bool) -> Vec<Uuid> {
  compute_permissions(signers, send_in_order)
    .into_iter()
    .filter(|p| p.can_sign)
    .map(|p| p.signer_id)
    .collect()
}
