//! Run-wide citation index.
//!
//! A citation ID names the same source record wherever it is referenced, so
//! its metadata and image are materialised once per run no matter how many
//! persons cite it. Each ID owns a [`OnceCell`]: the first reference performs
//! the ledger check and download, concurrent references to the same ID wait
//! for that result, and different IDs proceed in parallel.

use std::{
  collections::{BTreeMap, HashMap, HashSet},
  future::Future,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use futures::{StreamExt as _, stream};
use lineage_core::{
  citation::{AssetRequest, Citation, CitationRecord, MediaCategory, MediaKey},
  person::PersonId,
  report::{FailureKind, FailureReport, FailureSubject, Stage},
  upstream::{MediaLedger, Upstream},
};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  config::EngineConfig,
  media::{Assets, Obtained, citation_file_name},
};

// ─── Index ───────────────────────────────────────────────────────────────────

/// Citation ID → materialised citation, each slot initialised at most once.
#[derive(Debug, Default)]
pub struct CitationIndex {
  slots: Mutex<HashMap<String, Arc<OnceCell<Citation>>>>,
}

impl CitationIndex {
  pub fn new() -> Self { Self::default() }

  /// The citation for `citation_id`, running `init` only if no other caller
  /// has materialised (or is materialising) it.
  pub async fn get_or_materialize<F, Fut>(&self, citation_id: &str, init: F) -> Citation
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Citation>,
  {
    let cell = {
      let mut slots = self.slots.lock().await;
      slots.entry(citation_id.to_owned()).or_default().clone()
    };
    cell.get_or_init(init).await.clone()
  }

  /// Every materialised citation, by ID.
  pub async fn snapshot(&self) -> BTreeMap<String, Citation> {
    self
      .slots
      .lock()
      .await
      .iter()
      .filter_map(|(id, cell)| cell.get().map(|c| (id.clone(), c.clone())))
      .collect()
  }
}

// ─── Indexer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct IndexOutcome {
  pub citations:  BTreeMap<String, Citation>,
  pub downloaded: usize,
  pub reused:     usize,
  pub report:     FailureReport,
}

pub struct CitationMediaIndexer<'a, U, L> {
  pub assets: Assets<'a, U, L>,
  pub config: &'a EngineConfig,
  pub cancel: &'a CancellationToken,
}

/// Mutable state shared by concurrent materialisations.
#[derive(Default)]
struct Tally {
  downloaded: AtomicUsize,
  reused:     AtomicUsize,
  report:     Mutex<FailureReport>,
}

impl<U: Upstream, L: MediaLedger> CitationMediaIndexer<'_, U, L> {
  /// Materialise every citation referenced by `references`.
  ///
  /// `sources` holds the known source records by citation ID. A referenced
  /// ID with no record is reported and skipped; the persons keep the ID.
  pub async fn index(
    &self,
    references: &[(PersonId, Vec<String>)],
    sources: &HashMap<String, CitationRecord>,
  ) -> IndexOutcome {
    let mut report = FailureReport::default();
    let mut unresolved = HashSet::new();
    let mut work = Vec::new();
    for (person_id, ids) in references {
      for id in ids {
        match sources.get(id) {
          Some(record) => work.push(record),
          None if unresolved.insert(id.as_str()) => {
            warn!(%person_id, citation_id = %id, "citation has no source record");
            report.anomaly(
              Stage::Citations,
              FailureSubject::Citation(id.clone()),
              format!("referenced by {person_id} but no source record was found"),
            );
          }
          None => {}
        }
      }
    }

    info!(references = work.len(), "indexing citations");
    let index = CitationIndex::new();
    let tally = Tally::default();
    stream::iter(work)
      .map(|record| {
        index.get_or_materialize(&record.citation_id, || self.materialize(record, &tally))
      })
      .buffer_unordered(self.config.workers)
      .for_each(|_| async {})
      .await;

    report.extend(tally.report.into_inner());
    let outcome = IndexOutcome {
      citations: index.snapshot().await,
      downloaded: tally.downloaded.into_inner(),
      reused: tally.reused.into_inner(),
      report,
    };
    info!(
      citations = outcome.citations.len(),
      downloaded = outcome.downloaded,
      reused = outcome.reused,
      "citations indexed"
    );
    outcome
  }

  /// Runs once per citation ID.
  async fn materialize(&self, record: &CitationRecord, tally: &Tally) -> Citation {
    let citation_id = &record.citation_id;
    let key = MediaKey::citation(citation_id.clone());
    let local_asset = match &record.image_ref {
      None => None,
      // Cancelled: recorded assets are still reused, only downloads stop.
      Some(_) if self.cancel.is_cancelled() => match self.assets.recorded(&key).await {
        Ok(Some(asset)) => {
          tally.reused.fetch_add(1, Ordering::SeqCst);
          Some(asset)
        }
        Ok(None) => {
          debug!(%citation_id, "cancelled; image not fetched");
          tally.report.lock().await.record(
            FailureKind::Cancelled,
            Stage::Citations,
            FailureSubject::Media(key),
            "run cancelled before image was downloaded",
          );
          None
        }
        Err(reason) => {
          warn!(%citation_id, %reason, "citation image not obtained");
          tally.report.lock().await.asset(Stage::Citations, key, reason);
          None
        }
      },
      Some(url) => {
        let request = AssetRequest {
          key:        key.clone(),
          remote_ref: url.clone(),
          category:   MediaCategory::Record,
          file_name:  citation_file_name(citation_id, url),
          title:      (!record.title.is_empty()).then(|| record.title.clone()),
        };
        match self.assets.obtain(request).await {
          Ok(Obtained::Reused(asset)) => {
            tally.reused.fetch_add(1, Ordering::SeqCst);
            Some(asset)
          }
          Ok(Obtained::Downloaded(asset)) => {
            tally.downloaded.fetch_add(1, Ordering::SeqCst);
            Some(asset)
          }
          Err(reason) => {
            warn!(%citation_id, %reason, "citation image not obtained");
            tally.report.lock().await.asset(Stage::Citations, key, reason);
            None
          }
        }
      }
    };

    let citation = Citation { record: record.clone(), local_asset };
    if let Err(e) = self.assets.ledger.record_citation(citation.clone()).await {
      warn!(%citation_id, error = %e, "citation metadata not recorded");
      tally.report.lock().await.record(
        FailureKind::DegradedAsset,
        Stage::Citations,
        FailureSubject::Citation(citation_id.clone()),
        format!("metadata not recorded: {e}"),
      );
    }
    citation
  }
}
