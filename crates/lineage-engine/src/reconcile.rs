//! The reconciler: catalog, per-person units, barrier, inference, citations.
//!
//! Per-person units run on a bounded pool; each person is owned by exactly
//! one unit. Inference and citation indexing read the whole population, so
//! they start only after every unit has finished.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use futures::{StreamExt as _, stream};
use lineage_core::{
  citation::CitationRecord,
  edge::Edge,
  person::{Person, PersonId},
  report::{FailureKind, FailureReport, FailureSubject, Stage},
  tree::{ReconciledTree, RunStats},
  upstream::{MediaLedger, Upstream},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Result,
  catalog::{CatalogFetcher, CatalogParams},
  citations::CitationMediaIndexer,
  config::EngineConfig,
  detail::{self, DetailAugmenter, DetailFailure},
  graph::{self, GraphBuilder, GraphFailure},
  infer,
  media::{Assets, PersonMedia},
  throttle::Throttle,
};

/// Everything one per-person unit produced.
struct UnitOutcome {
  person:  Person,
  /// `None` when the relationship view could not be used.
  edges:   Option<Vec<Edge>>,
  sources: Vec<CitationRecord>,
  media:   PersonMedia,
  report:  FailureReport,
}

impl UnitOutcome {
  fn untouched(person: Person, report: FailureReport) -> Self {
    Self {
      person,
      edges: None,
      sources: Vec::new(),
      media: PersonMedia::default(),
      report,
    }
  }
}

pub struct Reconciler<U, L> {
  upstream: U,
  ledger:   L,
  config:   EngineConfig,
  throttle: Throttle,
  cancel:   CancellationToken,
}

impl<U: Upstream, L: MediaLedger> Reconciler<U, L> {
  pub fn new(upstream: U, ledger: L, config: EngineConfig) -> Result<Self> {
    config.validate()?;
    let throttle = Throttle::per_second(config.requests_per_second)?;
    Ok(Self {
      upstream,
      ledger,
      config,
      throttle,
      cancel: CancellationToken::new(),
    })
  }

  /// Use `cancel` instead of the reconciler's own token.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// Cancelling this token stops new units from starting. Units already
  /// running finish; the run still returns a tree.
  pub fn cancellation_token(&self) -> CancellationToken { self.cancel.clone() }

  pub fn upstream(&self) -> &U { &self.upstream }

  pub fn ledger(&self) -> &L { &self.ledger }

  pub fn config(&self) -> &EngineConfig { &self.config }

  fn assets(&self) -> Assets<'_, U, L> {
    Assets {
      upstream: &self.upstream,
      ledger:   &self.ledger,
      throttle: &self.throttle,
      config:   &self.config,
    }
  }

  /// Run one reconciliation. Fails only when the catalog cannot be counted;
  /// every other problem is in the returned report.
  pub async fn reconcile(
    &self,
    params: CatalogParams,
  ) -> Result<(ReconciledTree, FailureReport)> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, workers = self.config.workers, "reconciliation started");

    let catalog = CatalogFetcher {
      upstream: &self.upstream,
      throttle: &self.throttle,
      config:   &self.config,
      cancel:   &self.cancel,
    }
    .fetch(params)
    .await?;
    let mut report = catalog.report;
    let snapshot = catalog.snapshot;

    let mut units: Vec<UnitOutcome> = stream::iter(snapshot.roster.iter().cloned())
      .map(|person| self.run_unit(person))
      .buffer_unordered(self.config.workers)
      .collect()
      .await;
    units.sort_by(|a, b| a.person.person_id.cmp(&b.person.person_id));

    // Barrier: every unit has finished.
    let mut persons = BTreeMap::new();
    let mut edges = BTreeMap::new();
    let mut media = BTreeMap::new();
    let mut sources: HashMap<String, CitationRecord> = HashMap::new();
    let (mut downloaded, mut reused) = (0, 0);
    for unit in units {
      let person_id = unit.person.person_id.clone();
      report.extend(unit.report);
      for record in unit.sources {
        sources.entry(record.citation_id.clone()).or_insert(record);
      }
      if let Some(list) = unit.edges {
        edges.insert(person_id.clone(), list);
      }
      downloaded += unit.media.downloaded;
      reused += unit.media.reused;
      if !unit.media.assets.is_empty() {
        media.insert(person_id.clone(), unit.media.assets);
      }
      persons.insert(person_id, unit.person);
    }

    let inferred = infer::infer_event_types(&mut persons, &edges);
    info!(inferred, "event types inferred");

    let references: Vec<(PersonId, Vec<String>)> = persons
      .values()
      .filter(|p| !p.citation_ids.is_empty())
      .map(|p| (p.person_id.clone(), p.citation_ids.clone()))
      .collect();
    let indexed = CitationMediaIndexer {
      assets: self.assets(),
      config: &self.config,
      cancel: &self.cancel,
    }
    .index(&references, &sources)
    .await;
    report.extend(indexed.report);

    if self.cancel.is_cancelled() {
      report.cancelled = true;
    }
    report.sort();

    let stats = RunStats {
      catalog_total:     snapshot.total,
      persons:           persons.len(),
      edges:             edges.values().map(Vec::len).sum(),
      citations:         indexed.citations.len(),
      assets_downloaded: downloaded + indexed.downloaded,
      assets_reused:     reused + indexed.reused,
      inferred_events:   inferred,
    };
    let tree = ReconciledTree {
      run_id,
      started_at,
      finished_at: Utc::now(),
      persons,
      edges,
      citations: indexed.citations,
      media,
      stats,
      catalog: snapshot,
    };

    info!(
      %run_id,
      persons = tree.stats.persons,
      edges = tree.stats.edges,
      citations = tree.stats.citations,
      downloaded = tree.stats.assets_downloaded,
      reused = tree.stats.assets_reused,
      failures = report.failures.len(),
      cancelled = report.cancelled,
      "reconciliation finished"
    );
    Ok((tree, report))
  }

  /// Relationships, detail and person media for one person.
  async fn run_unit(&self, mut person: Person) -> UnitOutcome {
    let person_id = person.person_id.clone();
    let mut report = FailureReport::default();

    if self.cancel.is_cancelled() {
      report.record(
        FailureKind::Cancelled,
        Stage::Scheduling,
        FailureSubject::Person(person_id),
        "run cancelled before unit started",
      );
      return UnitOutcome::untouched(person, report);
    }
    debug!(%person_id, "unit started");

    let builder = GraphBuilder { upstream: &self.upstream, throttle: &self.throttle };
    let edges = match builder.build(&person_id).await {
      Ok(outcome) => {
        for note in &outcome.skipped {
          report.anomaly(
            Stage::Relationships,
            FailureSubject::Person(person_id.clone()),
            note.clone(),
          );
        }
        graph::merge_into(&mut person, &outcome);
        Some(outcome.edges)
      }
      Err(GraphFailure::Fetch(reason)) => {
        warn!(%person_id, %reason, "relationships unavailable");
        report.degraded(Stage::Relationships, &person_id, reason);
        None
      }
      Err(GraphFailure::Malformed(reason)) => {
        warn!(%person_id, %reason, "relationship view unusable");
        report.anomaly(
          Stage::Relationships,
          FailureSubject::Person(person_id.clone()),
          reason,
        );
        None
      }
    };

    let augmenter = DetailAugmenter {
      upstream: &self.upstream,
      throttle: &self.throttle,
      config:   &self.config,
    };
    let mut sources = Vec::new();
    match augmenter.fetch(&person_id).await {
      Ok(Some(outcome)) => {
        let stats = detail::apply(&mut person, &outcome);
        debug!(
          %person_id,
          enriched = stats.enriched,
          appended = stats.appended,
          citations = outcome.citation_ids.len(),
          "detail merged"
        );
        sources = outcome.sources;
      }
      Ok(None) => debug!(%person_id, "no detail data on page"),
      Err(DetailFailure::Fetch(reason)) => {
        warn!(%person_id, %reason, "detail unavailable");
        report.degraded(Stage::Detail, &person_id, reason);
      }
      Err(DetailFailure::Malformed(reason)) => {
        warn!(%person_id, %reason, "detail blob unusable");
        report.anomaly(Stage::Detail, FailureSubject::Person(person_id.clone()), reason);
      }
    }

    let media = if self.config.person_media {
      self.assets().person_media(&person, &mut report).await
    } else {
      PersonMedia::default()
    };

    UnitOutcome { person, edges, sources, media, report }
  }
}
