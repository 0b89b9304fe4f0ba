//! Database query modules
//!
//! Schema creation lives in `xat_common::db`; these modules hold the
//! per-table operations used by `SqliteStore` and the CLI.

pub mod interactions;
pub mod judgments;
pub mod settings;
