//! SQLite backend for lineage runs.
//!
//! Implements [`MediaLedger`](lineage_core::upstream::MediaLedger) with files
//! on disk and their metadata in SQLite, and keeps reconciled snapshots so a
//! later run can resume its catalog. Database access goes through
//! [`tokio_rusqlite`] and never blocks the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoredSnapshot};
