//! The failure report. Every degraded outcome of a run lands here.
//!
//! Only a fatal error aborts a run. Everything else is absorbed by the stage
//! that hit it and surfaces here; no failure is dropped without an entry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::{citation::MediaKey, person::PersonId};

/// The stage that recorded a failure.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
  Catalog,
  Relationships,
  Detail,
  PersonMedia,
  Citations,
  Scheduling,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
  /// A catalog page that never arrived.
  CatalogGap,
  /// A per-person fetch failed after retries; the person keeps partial data.
  DegradedEntity,
  /// A media download failed; metadata is kept, the asset is absent.
  DegradedAsset,
  /// A payload was malformed or referenced something unresolvable; treated
  /// as "no additional data".
  DataAnomaly,
  /// The run was cancelled before this unit or download started.
  Cancelled,
}

/// What a failure is about.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum FailureSubject {
  Page(u32),
  Person(PersonId),
  Citation(String),
  Media(MediaKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
  pub kind:    FailureKind,
  pub stage:   Stage,
  pub subject: FailureSubject,
  pub reason:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
  pub failures:  Vec<Failure>,
  /// Set when the run was interrupted; some units may never have started.
  pub cancelled: bool,
}

impl FailureReport {
  pub fn record(
    &mut self,
    kind: FailureKind,
    stage: Stage,
    subject: FailureSubject,
    reason: impl Into<String>,
  ) {
    self.failures.push(Failure { kind, stage, subject, reason: reason.into() });
  }

  pub fn gap(&mut self, page: u32, reason: impl Into<String>) {
    self.record(
      FailureKind::CatalogGap,
      Stage::Catalog,
      FailureSubject::Page(page),
      reason,
    );
  }

  pub fn degraded(
    &mut self,
    stage: Stage,
    person_id: &PersonId,
    reason: impl Into<String>,
  ) {
    self.record(
      FailureKind::DegradedEntity,
      stage,
      FailureSubject::Person(person_id.clone()),
      reason,
    );
  }

  pub fn anomaly(
    &mut self,
    stage: Stage,
    subject: FailureSubject,
    reason: impl Into<String>,
  ) {
    self.record(FailureKind::DataAnomaly, stage, subject, reason);
  }

  pub fn asset(&mut self, stage: Stage, key: MediaKey, reason: impl Into<String>) {
    self.record(
      FailureKind::DegradedAsset,
      stage,
      FailureSubject::Media(key),
      reason,
    );
  }

  pub fn extend(&mut self, other: FailureReport) {
    self.failures.extend(other.failures);
    self.cancelled |= other.cancelled;
  }

  /// Stable order independent of worker scheduling.
  pub fn sort(&mut self) {
    self.failures.sort_by(|a, b| {
      (a.stage, &a.subject, a.kind, &a.reason)
        .cmp(&(b.stage, &b.subject, b.kind, &b.reason))
    });
  }

  pub fn is_clean(&self) -> bool { self.failures.is_empty() && !self.cancelled }

  pub fn of_kind(&self, kind: FailureKind) -> impl Iterator<Item = &Failure> {
    self.failures.iter().filter(move |f| f.kind == kind)
  }

  /// Catalog pages that were never obtained.
  pub fn gaps(&self) -> BTreeSet<u32> {
    self
      .of_kind(FailureKind::CatalogGap)
      .filter_map(|f| match f.subject {
        FailureSubject::Page(p) => Some(p),
        _ => None,
      })
      .collect()
  }

  /// Persons degraded at `stage`, or at any stage when `stage` is `None`.
  pub fn degraded_entities(&self, stage: Option<Stage>) -> BTreeSet<PersonId> {
    self
      .of_kind(FailureKind::DegradedEntity)
      .filter(|f| stage.is_none_or(|s| s == f.stage))
      .filter_map(|f| match &f.subject {
        FailureSubject::Person(id) => Some(id.clone()),
        _ => None,
      })
      .collect()
  }
}
