//! The lineage reconciliation engine.
//!
//! Builds one consistent, deduplicated family tree out of a catalog, a
//! per-person relationship view and a per-person detail page, each of which is
//! incomplete and unreliable on its own. Stages, leaves first:
//!
//! - [`catalog`]: paginated, resumable roster acquisition
//! - [`graph`]: per-person edges and first-pass events
//! - [`detail`]: per-person place/description/citation refinement
//! - [`infer`]: event types from relational date coincidence
//! - [`citations`]: run-wide citation and media deduplication
//! - [`reconcile`]: the orchestrator tying them together
//!
//! Only an unobtainable catalog is fatal. Every other failure is absorbed and
//! reported in the [`FailureReport`](lineage_core::report::FailureReport).

pub mod catalog;
pub mod citations;
pub mod config;
pub mod detail;
pub mod error;
pub mod graph;
pub mod infer;
pub mod label;
pub mod ledger;
pub mod media;
pub mod reconcile;
pub mod scan;
pub mod throttle;

pub use catalog::CatalogParams;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use ledger::MemoryLedger;
pub use reconcile::Reconciler;

#[cfg(test)]
mod tests;
