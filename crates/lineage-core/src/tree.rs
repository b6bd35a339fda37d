//! The reconciled tree, aggregate root of one run.
//!
//! Persons are held in an arena keyed by id; relationships are adjacency lists
//! keyed by the source person's id. Nothing holds a reference to another
//! record, so spouse/parent/child cycles are just ids.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  citation::{Citation, MediaAsset},
  edge::{Edge, EdgeKind},
  person::{Person, PersonId},
};

// ─── Catalog snapshot ────────────────────────────────────────────────────────

/// Pagination bookkeeping for the roster, kept so an interrupted or gappy
/// acquisition can be resumed without refetching pages already obtained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
  pub total:         u32,
  pub page_size:     u32,
  pub fetched_pages: BTreeSet<u32>,
  /// Roster as the catalog described it, before any merging. Order carries
  /// no meaning beyond pagination.
  pub roster:        Vec<Person>,
}

impl CatalogSnapshot {
  pub fn page_count(&self) -> u32 {
    if self.page_size == 0 {
      0
    } else {
      self.total.div_ceil(self.page_size)
    }
  }

  /// Pages in `1..=page_count` not yet fetched.
  pub fn missing_pages(&self) -> Vec<u32> {
    (1..=self.page_count())
      .filter(|p| !self.fetched_pages.contains(p))
      .collect()
  }

  pub fn is_complete(&self) -> bool { self.missing_pages().is_empty() }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
  pub catalog_total:     u32,
  pub persons:           usize,
  pub edges:             usize,
  pub citations:         usize,
  pub assets_downloaded: usize,
  pub assets_reused:     usize,
  pub inferred_events:   usize,
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledTree {
  pub run_id:      Uuid,
  pub started_at:  DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
  pub persons:     BTreeMap<PersonId, Person>,
  pub edges:       BTreeMap<PersonId, Vec<Edge>>,
  pub citations:   BTreeMap<String, Citation>,
  /// Person-scoped media, in upstream order.
  pub media:       BTreeMap<PersonId, Vec<MediaAsset>>,
  pub stats:       RunStats,
  pub catalog:     CatalogSnapshot,
}

impl ReconciledTree {
  pub fn person(&self, id: &PersonId) -> Option<&Person> {
    self.persons.get(id)
  }

  pub fn citation(&self, citation_id: &str) -> Option<&Citation> {
    self.citations.get(citation_id)
  }

  pub fn edges_of(&self, id: &PersonId) -> &[Edge] {
    self.edges.get(id).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn media_of(&self, id: &PersonId) -> &[MediaAsset] {
    self.media.get(id).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn parents_of(&self, id: &PersonId) -> Vec<&Edge> {
    self.edges_of_kind(id, EdgeKind::Parent)
  }

  pub fn children_of(&self, id: &PersonId) -> Vec<&Edge> {
    self.edges_of_kind(id, EdgeKind::Child)
  }

  pub fn spouses_of(&self, id: &PersonId) -> Vec<&Edge> {
    self.edges_of_kind(id, EdgeKind::Spouse)
  }

  /// Every other person with at least one parent edge target in common.
  pub fn siblings_of(&self, id: &PersonId) -> Vec<&PersonId> {
    siblings(&self.edges, id)
  }

  fn edges_of_kind(&self, id: &PersonId, kind: EdgeKind) -> Vec<&Edge> {
    self.edges_of(id).iter().filter(|e| e.kind == kind).collect()
  }

  /// Equality of the reconciled content, ignoring run identity and timing.
  pub fn same_content(&self, other: &Self) -> bool {
    self.persons == other.persons
      && self.edges == other.edges
      && self.citations == other.citations
      && self.media == other.media
  }
}

/// Siblings of `id` under an adjacency map: persons other than `id` sharing at
/// least one parent target. Sorted by id.
pub fn siblings<'a>(
  edges: &'a BTreeMap<PersonId, Vec<Edge>>,
  id: &PersonId,
) -> Vec<&'a PersonId> {
  let parents_of = |list: &'a [Edge]| -> BTreeSet<&'a PersonId> {
    list
      .iter()
      .filter(|e| e.kind == EdgeKind::Parent)
      .map(|e| &e.target)
      .collect()
  };

  let Some(own) = edges.get(id).map(|e| parents_of(e.as_slice())) else {
    return Vec::new();
  };
  if own.is_empty() {
    return Vec::new();
  }

  edges
    .iter()
    .filter(|(other, _)| *other != id)
    .filter(|(_, e)| !parents_of(e.as_slice()).is_disjoint(&own))
    .map(|(other, _)| other)
    .collect()
}
