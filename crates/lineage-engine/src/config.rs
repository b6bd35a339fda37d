//! Engine tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Every knob the engine exposes. Missing keys take the defaults below when
/// deserialised from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Catalog page size used when the caller does not pass one.
  pub page_size:                 u32,
  pub page_attempts:             u32,
  /// Delay before the first page retry; doubled for each further retry.
  pub page_backoff_ms:           u64,
  /// Upper bound on concurrently running per-person units.
  pub workers:                   usize,
  /// Shared budget across every upstream call.
  pub requests_per_second:       u32,
  pub detail_timeout_secs:       u64,
  pub detail_retry_timeout_secs: u64,
  pub detail_cooldown_secs:      u64,
  /// Attempts per asset download, inside a single materialisation.
  pub asset_attempts:            u32,
  pub asset_backoff_ms:          u64,
  /// Collect media attached directly to persons.
  pub person_media:              bool,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      page_size:                 100,
      page_attempts:             3,
      page_backoff_ms:           500,
      workers:                   4,
      requests_per_second:       4,
      detail_timeout_secs:       30,
      detail_retry_timeout_secs: 35,
      detail_cooldown_secs:      30,
      asset_attempts:            2,
      asset_backoff_ms:          1000,
      person_media:              true,
    }
  }
}

impl EngineConfig {
  pub fn validate(&self) -> Result<()> {
    let checks = [
      ("page_size", self.page_size == 0),
      ("page_attempts", self.page_attempts == 0),
      ("workers", self.workers == 0),
      ("requests_per_second", self.requests_per_second == 0),
      ("detail_timeout_secs", self.detail_timeout_secs == 0),
      ("detail_retry_timeout_secs", self.detail_retry_timeout_secs == 0),
      ("asset_attempts", self.asset_attempts == 0),
    ];
    match checks.iter().find(|(_, zero)| *zero) {
      Some((name, _)) => Err(Error::InvalidConfig(format!("{name} must be non-zero"))),
      None => Ok(()),
    }
  }

  pub fn page_backoff(&self) -> Duration { Duration::from_millis(self.page_backoff_ms) }

  pub fn asset_backoff(&self) -> Duration { Duration::from_millis(self.asset_backoff_ms) }

  pub fn detail_timeout(&self) -> Duration { Duration::from_secs(self.detail_timeout_secs) }

  pub fn detail_retry_timeout(&self) -> Duration {
    Duration::from_secs(self.detail_retry_timeout_secs)
  }

  pub fn detail_cooldown(&self) -> Duration { Duration::from_secs(self.detail_cooldown_secs) }
}
