//! Signer transitions: the only way a signer's status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signer::{Signer, SignerStatus};

/// What a signer does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
  Sign,
  Decline {
    #[serde(default)]
    reason: Option<String>,
  },
}

impl Action {
  /// The status a signer ends up in after this action.
  pub fn target(&self) -> SignerStatus {
    match self {
      Self::Sign => SignerStatus::Signed,
      Self::Decline { .. } => SignerStatus::Declined,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("signer has already {0}")]
  AlreadyActed(SignerStatus),
}

/// Move `signer` into the terminal status selected by `action`.
///
/// `signed_at` / `declined_at` are written here and nowhere else, so each is
/// set at most once.
pub fn apply_action(
  signer: &mut Signer,
  action: Action,
  at: DateTime<Utc>,
) -> Result<(), TransitionError> {
  if signer.status.is_terminal() {
    return Err(TransitionError::AlreadyActed(signer.status));
  }

  match action {
    Action::Sign => {
      signer.status = SignerStatus::Signed;
      signer.signed_at = Some(at);
    }
    Action::Decline { reason } => {
      signer.status = SignerStatus::Declined;
      signer.declined_at = Some(at);
      signer.decline_reason = reason;
    }
  }
  Ok(())
}
