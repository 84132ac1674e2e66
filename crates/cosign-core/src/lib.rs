//! Core types and the signature workflow engine for Cosign.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The engine modules (`order`, `permissions`, `aggregate`, `authorize`,
//! `transition`) are pure and synchronous; `workflow` drives them against any
//! [`store::DocumentStore`].

pub mod aggregate;
pub mod authorize;
pub mod document;
pub mod error;
pub mod identity;
pub mod order;
pub mod permissions;
pub mod signer;
pub mod store;
pub mod transition;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
