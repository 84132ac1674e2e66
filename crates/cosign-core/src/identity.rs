//! Identity: who is acting, or who created a document.
//!
//! Identities are always passed explicitly; nothing in the engine looks up a
//! "current user".

use serde::{Deserialize, Serialize};

/// A user id and/or an email address. Either may be absent, e.g. a public
/// signing link only knows the email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  #[serde(default)]
  pub user_id: Option<String>,
  #[serde(default)]
  pub email:   Option<String>,
}

impl Identity {
  pub fn user(user_id: impl Into<String>) -> Self {
    Self {
      user_id: Some(user_id.into()),
      email:   None,
    }
  }

  pub fn email(email: impl Into<String>) -> Self {
    Self {
      user_id: None,
      email:   Some(email.into()),
    }
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }

  /// `true` when both sides carry a user id and they are equal.
  pub fn same_user(&self, other: &Identity) -> bool {
    matches!((&self.user_id, &other.user_id), (Some(a), Some(b)) if a == b)
  }

  /// `true` when both sides carry an email and they are equal. Comparison is
  /// case-sensitive.
  pub fn same_email(&self, other: &Identity) -> bool {
    matches!((&self.email, &other.email), (Some(a), Some(b)) if a == b)
  }

  /// User-id match, or email match.
  pub fn matches(&self, other: &Identity) -> bool {
    self.same_user(other) || self.same_email(other)
  }

  pub fn is_empty(&self) -> bool {
    self.user_id.is_none() && self.email.is_none()
  }
}
