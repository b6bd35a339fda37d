//! Roster acquisition.
//!
//! The catalog is probed for its total, then read page by page. A page that
//! still fails after the configured retries becomes a gap in the report; the
//! run carries on with the pages it has. Only a failed count probe is fatal.

use std::collections::HashSet;

use lineage_core::{
  person::PersonId,
  report::{FailureKind, FailureReport, FailureSubject, Stage},
  tree::CatalogSnapshot,
  upstream::Upstream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Error, Result, config::EngineConfig, throttle::Throttle};

/// How to acquire the roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogParams {
  /// `None` uses the engine's configured page size.
  pub page_size: Option<u32>,
  /// A snapshot from an earlier run. Pages it already holds are not fetched
  /// again, provided the page size is unchanged.
  pub resume:    Option<CatalogSnapshot>,
}

impl CatalogParams {
  pub fn resume(snapshot: CatalogSnapshot) -> Self {
    Self { page_size: Some(snapshot.page_size), resume: Some(snapshot) }
  }
}

#[derive(Debug)]
pub struct CatalogOutcome {
  pub snapshot: CatalogSnapshot,
  pub report:   FailureReport,
}

pub struct CatalogFetcher<'a, U> {
  pub upstream: &'a U,
  pub throttle: &'a Throttle,
  pub config:   &'a EngineConfig,
  pub cancel:   &'a CancellationToken,
}

impl<U: Upstream> CatalogFetcher<'_, U> {
  pub async fn fetch(&self, params: CatalogParams) -> Result<CatalogOutcome> {
    let page_size = params.page_size.unwrap_or(self.config.page_size);
    if page_size == 0 {
      return Err(Error::InvalidConfig("page_size must be non-zero".into()));
    }

    let total = self
      .throttle
      .retry(
        "catalog count",
        self.config.page_attempts,
        self.config.page_backoff(),
        || self.upstream.fetch_catalog_count(),
      )
      .await
      .map_err(|e| Error::CatalogCount(Box::new(e)))?;

    let mut snapshot = match params.resume {
      Some(prev) if prev.page_size == page_size => {
        info!(
          fetched = prev.fetched_pages.len(),
          roster = prev.roster.len(),
          previous_total = prev.total,
          total,
          "resuming catalog"
        );
        CatalogSnapshot { total, ..prev }
      }
      Some(prev) => {
        info!(
          previous_page_size = prev.page_size,
          page_size,
          "page size changed since snapshot; starting over"
        );
        CatalogSnapshot { total, page_size, ..CatalogSnapshot::default() }
      }
      None => CatalogSnapshot { total, page_size, ..CatalogSnapshot::default() },
    };

    let mut seen: HashSet<PersonId> =
      snapshot.roster.iter().map(|p| p.person_id.clone()).collect();
    let mut report = FailureReport::default();
    let pending = snapshot.missing_pages();
    info!(total, page_size, pages = pending.len(), "fetching catalog");

    for (i, &page) in pending.iter().enumerate() {
      if self.cancel.is_cancelled() {
        warn!(remaining = pending.len() - i, "catalog cancelled");
        for &skipped in &pending[i..] {
          report.record(
            FailureKind::Cancelled,
            Stage::Catalog,
            FailureSubject::Page(skipped),
            "run cancelled before page was fetched",
          );
        }
        report.cancelled = true;
        break;
      }

      let result = self
        .throttle
        .retry(
          "catalog page",
          self.config.page_attempts,
          self.config.page_backoff(),
          || self.upstream.fetch_catalog_page(page, page_size),
        )
        .await;

      let records = match result {
        Ok(records) => records,
        Err(e) => {
          warn!(page, error = %e, "catalog page unavailable");
          report.gap(page, e.to_string());
          continue;
        }
      };

      let mut added = 0usize;
      for (slot, record) in records.iter().enumerate() {
        match record.to_person() {
          Ok(person) if seen.insert(person.person_id.clone()) => {
            snapshot.roster.push(person);
            added += 1;
          }
          Ok(person) => {
            debug!(page, person_id = %person.person_id, "duplicate catalog entry");
          }
          Err(e) => {
            warn!(page, slot, error = %e, "catalog entry skipped");
            report.anomaly(
              Stage::Catalog,
              FailureSubject::Page(page),
              format!("entry {slot}: {e}"),
            );
          }
        }
      }
      snapshot.fetched_pages.insert(page);
      debug!(page, received = records.len(), added, "catalog page fetched");
    }

    info!(
      roster = snapshot.roster.len(),
      gaps = report.gaps().len(),
      "catalog acquired"
    );
    Ok(CatalogOutcome { snapshot, report })
  }
}
