//! Error type for `lineage-engine`.
//!
//! Only conditions under which no tree can be produced at all are errors.
//! Everything else is recorded in the failure report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("catalog count unavailable: {0}")]
  CatalogCount(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid engine configuration: {0}")]
  InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
