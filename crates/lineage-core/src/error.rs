//! Error types for `lineage-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("payload record has no person id")]
  MissingPersonId,

  #[error("unknown media key: {0:?}")]
  UnknownMediaKey(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
