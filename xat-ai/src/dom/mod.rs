//! In-memory host document
//!
//! A `scraper` tree wrapped with mutation tracking. The scanner reads and
//! annotates it; every structural or attribute write is reported to the
//! registered observers as a `MutationRecord`. Queries compile to
//! `scraper::Selector`s.

pub mod document;
pub mod query;

pub use document::{Document, MutationKind, MutationOrigin, MutationRecord, NodeId, SharedDocument};
pub use query::Query;
