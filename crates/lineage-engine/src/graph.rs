//! Per-person relationship graph.
//!
//! The relationship view is queried once per person with one generation up
//! and down. It is authoritative for edges and for the existence and dates of
//! events; event types it leaves blank are filled later.

use std::collections::HashMap;

use lineage_core::{
  edge::{Edge, EdgeKind},
  event::Event,
  payload::{FamilyView, RemotePerson},
  person::{Gender, Person, PersonId},
  upstream::Upstream,
};
use tracing::debug;

use crate::throttle::Throttle;

/// What one relationship view yields for its focal person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphOutcome {
  pub edges:   Vec<Edge>,
  pub events:  Vec<Event>,
  pub focal:   FocalFields,
  /// Family entries that could not become edges.
  pub skipped: Vec<String>,
}

/// Identity fields the view carries for the focal person. Used to fill gaps
/// the catalog left, never to overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocalFields {
  pub display_name: String,
  pub gender:       Gender,
  pub living:       bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphFailure {
  /// The call itself failed.
  Fetch(String),
  /// The response does not describe the requested person.
  Malformed(String),
}

/// Turn a relationship view into edges and events for `person_id`.
pub fn extract(
  person_id: &PersonId,
  view: &FamilyView,
) -> Result<GraphOutcome, GraphFailure> {
  let by_id: HashMap<PersonId, &RemotePerson> = view
    .persons
    .iter()
    .filter_map(|p| p.person_id().map(|id| (id, p)))
    .collect();

  let focus = by_id.get(person_id).ok_or_else(|| {
    GraphFailure::Malformed(format!(
      "focal person absent from view of {} record(s)",
      view.persons.len()
    ))
  })?;

  let mut outcome = GraphOutcome {
    events: focus.events(),
    focal: FocalFields {
      display_name: focus.display_name(),
      gender:       focus.gender(),
      living:       focus.is_living,
    },
    ..GraphOutcome::default()
  };

  for member in &focus.family {
    let Some(target) = member.target.v.as_deref().filter(|t| !t.is_empty()) else {
      outcome.skipped.push(format!("family entry {:?} has no target", member.code));
      continue;
    };
    let Some(kind) = EdgeKind::from_family_code(&member.code) else {
      outcome.skipped.push(format!("unknown family code {:?} for {target}", member.code));
      continue;
    };
    let target = PersonId::from(target);
    let target_name = by_id
      .get(&target)
      .map(|p| p.display_name())
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| target.to_string());
    outcome.edges.push(Edge { kind, target, target_name });
  }

  Ok(outcome)
}

/// Fold a graph outcome into the catalog's record of the person.
///
/// Graph events replace catalog events when the view lists any. Identity
/// fields only fill blanks.
pub fn merge_into(person: &mut Person, outcome: &GraphOutcome) {
  if !outcome.events.is_empty() {
    person.events = outcome.events.clone();
  }
  if person.display_name.is_empty() {
    person.display_name = outcome.focal.display_name.clone();
  }
  if person.gender == Gender::Unknown {
    person.gender = outcome.focal.gender;
  }
  person.living |= outcome.focal.living;
}

pub struct GraphBuilder<'a, U> {
  pub upstream: &'a U,
  pub throttle: &'a Throttle,
}

impl<U: Upstream> GraphBuilder<'_, U> {
  pub async fn build(&self, person_id: &PersonId) -> Result<GraphOutcome, GraphFailure> {
    self.throttle.ready().await;
    let view = self
      .upstream
      .fetch_relationships(person_id.clone())
      .await
      .map_err(|e| GraphFailure::Fetch(e.to_string()))?;
    let outcome = extract(person_id, &view)?;
    debug!(
      %person_id,
      edges = outcome.edges.len(),
      events = outcome.events.len(),
      "relationships fetched"
    );
    Ok(outcome)
  }
}
