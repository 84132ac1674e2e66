//! Signing rank: how signers are compared in an ordered document.
//!
//! Signers sharing an `order` value form one rank and become eligible
//! together. A signer with no `order` ranks after every ordered signer, and
//! all such signers share that last rank.

use crate::signer::{Signer, SignerStatus};

/// Position of a signer in the signing sequence.
///
/// The derived `Ord` puts every `Ordered` rank before `Unordered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
  Ordered(u32),
  Unordered,
}

impl Rank {
  pub fn of(signer: &Signer) -> Self {
    signer.order.map_or(Self::Unordered, Self::Ordered)
  }
}

/// The lowest rank held by a signer that has not signed, or `None` when every
/// signer has signed.
///
/// In an ordered document only not-yet-acted signers at exactly this rank may
/// act: everyone strictly before it has signed, and anyone after it is behind
/// a signer who has not.
pub fn frontier(signers: &[Signer]) -> Option<Rank> {
  signers
    .iter()
    .filter(|s| s.status != SignerStatus::Signed)
    .map(Rank::of)
    .min()
}
