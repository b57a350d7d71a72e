//! Entity storage.
//!
//! The engine reads through [`PayrollRepository`] and writes accrual
//! documents through [`DocumentStore`]. Both are backed in memory here; the
//! calculation code depends only on the traits.

#[cfg(test)]
pub(crate) mod fixtures;
mod memory;
mod repository;

pub use memory::{InMemoryDocumentStore, PayrollData, PayrollDataset};
pub use repository::{DocumentStore, NewDocument, NewResult, PayrollRepository};
