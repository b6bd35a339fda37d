//! Shared request budget and bounded retry.
//!
//! One [`Throttle`] is created per run and cloned into every stage, so the
//! catalog, per-person units and asset downloads all draw from the same
//! requests-per-second budget.

use std::{fmt::Display, future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::{Error, Result};

#[derive(Clone)]
pub struct Throttle {
  limiter: Arc<DefaultDirectRateLimiter>,
}

impl Throttle {
  pub fn per_second(requests: u32) -> Result<Self> {
    let rate = NonZeroU32::new(requests).ok_or_else(|| {
      Error::InvalidConfig("requests_per_second must be non-zero".into())
    })?;
    Ok(Self { limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))) })
  }

  /// Wait for one unit of budget.
  pub async fn ready(&self) { self.limiter.until_ready().await; }

  /// Run `op` up to `attempts` times, taking budget before each attempt and
  /// sleeping `backoff`, doubled per retry, between failures. Returns the last
  /// error when every attempt fails.
  pub async fn retry<T, E, F, Fut>(
    &self,
    what: &str,
    attempts: u32,
    backoff: Duration,
    mut op: F,
  ) -> Result<T, E>
  where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let mut delay = backoff;
    let mut attempt = 1;
    loop {
      self.ready().await;
      match op().await {
        Ok(value) => return Ok(value),
        Err(e) if attempt >= attempts => return Err(e),
        Err(e) => {
          warn!(what, attempt, error = %e, "attempt failed; retrying");
          tokio::time::sleep(delay).await;
          delay = delay.saturating_mul(2);
          attempt += 1;
        }
      }
    }
  }
}
