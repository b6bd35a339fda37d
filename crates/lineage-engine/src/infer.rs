//! Event-type inference from relational date coincidence.
//!
//! An unclassified, dated event of a person is often the birth or death of
//! someone close. When a relation has a `Birth` or `Death` on exactly the same
//! date, the event is labelled after it, e.g. `Death of mother Ann Lee`.
//!
//! Contributions, lowest precedence first: children and siblings (births and
//! deaths), then parents and spouses (deaths only). When several relations
//! share a date the later contribution wins. Types supplied by a source are
//! never touched.
//!
//! Labels are computed for everyone from one read of the population and only
//! then applied, so the outcome does not depend on iteration order.

use std::collections::{BTreeMap, HashMap};

use lineage_core::{
  edge::{Edge, EdgeKind},
  event::{BIRTH, DEATH, EventDate, KindSource},
  person::{Person, PersonId},
  tree,
};
use tracing::debug;

use crate::label::{Relation, event_label};

type Population = BTreeMap<PersonId, Person>;
type Adjacency = BTreeMap<PersonId, Vec<Edge>>;

/// Infer types for every unclassified, dated event. Returns how many events
/// received a type.
pub fn infer_event_types(persons: &mut Population, edges: &Adjacency) -> usize {
  let population: &Population = persons;
  let plan: Vec<(PersonId, Vec<(usize, String)>)> = population
    .values()
    .filter(|p| p.has_unclassified_events())
    .filter_map(|p| {
      let labels = date_labels(&p.person_id, population, edges);
      let assignments: Vec<(usize, String)> = p
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_inferable())
        .filter_map(|(i, e)| {
          let date = e.date.as_ref()?;
          labels.get(date).map(|l| (i, l.clone()))
        })
        .collect();
      (!assignments.is_empty()).then(|| (p.person_id.clone(), assignments))
    })
    .collect();

  let mut inferred = 0;
  for (person_id, assignments) in plan {
    let Some(person) = persons.get_mut(&person_id) else { continue };
    for (index, label) in assignments {
      debug!(%person_id, %label, "event type inferred");
      let event = &mut person.events[index];
      event.kind = label;
      event.kind_source = Some(KindSource::Inferred);
      inferred += 1;
    }
  }
  inferred
}

/// Date → label table for one focal person.
fn date_labels(
  person_id: &PersonId,
  persons: &Population,
  edges: &Adjacency,
) -> HashMap<EventDate, String> {
  let mut table = HashMap::new();
  let own = edges.get(person_id).map(Vec::as_slice).unwrap_or_default();
  let of_kind = move |kind: EdgeKind| {
    own.iter().filter(move |e| e.kind == kind).map(|e| &e.target)
  };

  for child in of_kind(EdgeKind::Child) {
    contribute(&mut table, persons.get(child), Relation::Child, &[BIRTH, DEATH]);
  }
  for sibling in tree::siblings(edges, person_id) {
    contribute(&mut table, persons.get(sibling), Relation::Sibling, &[BIRTH, DEATH]);
  }
  for parent in of_kind(EdgeKind::Parent) {
    contribute(&mut table, persons.get(parent), Relation::Parent, &[DEATH]);
  }
  for spouse in of_kind(EdgeKind::Spouse) {
    contribute(&mut table, persons.get(spouse), Relation::Spouse, &[DEATH]);
  }
  table
}

fn contribute(
  table: &mut HashMap<EventDate, String>,
  relation: Option<&Person>,
  kind: Relation,
  event_kinds: &[&str],
) {
  let Some(relation) = relation else { return };
  for event in &relation.events {
    let Some(date) = &event.date else { continue };
    let Some(event_kind) = event_kinds.iter().find(|k| event.is_kind(k)) else {
      continue;
    };
    table.insert(
      date.clone(),
      event_label(event_kind, kind, relation.gender, relation.label_name()),
    );
  }
}

#[cfg(test)]
mod tests {
  use lineage_core::{event::Event, person::Gender};

  use super::*;

  fn person(id: &str, name: &str, gender: Gender, events: &[(&str, &str)]) -> Person {
    let mut p = Person::new(PersonId::new(id), name);
    p.gender = gender;
    p.events = events
      .iter()
      .map(|(k, d)| Event::new(*k, Some(EventDate::new(*d))))
      .collect();
    p
  }

  fn edge(kind: EdgeKind, target: &str) -> Edge {
    Edge { kind, target: PersonId::new(target), target_name: target.into() }
  }

  fn population(people: Vec<Person>) -> Population {
    people.into_iter().map(|p| (p.person_id.clone(), p)).collect()
  }

  #[test]
  fn child_birth_labels_parent_event() {
    let mut persons = population(vec![
      person("p", "Ann", Gender::Female, &[("", "1900"), ("", "1777")]),
      person("c", "Tom", Gender::Male, &[("birth", "1900")]),
    ]);
    let edges = Adjacency::from([
      (PersonId::new("p"), vec![edge(EdgeKind::Child, "c")]),
    ]);

    assert_eq!(infer_event_types(&mut persons, &edges), 1);
    let p = &persons[&PersonId::new("p")];
    assert_eq!(p.events[0].kind, "Birth of son Tom");
    assert_eq!(p.events[0].kind_source, Some(KindSource::Inferred));
    assert!(p.events[1].is_unclassified());
  }

  #[test]
  fn parent_birth_does_not_contribute() {
    let mut persons = population(vec![
      person("c", "Tom", Gender::Male, &[("", "1870")]),
      person("p", "Ann", Gender::Female, &[("Birth", "1870")]),
    ]);
    let edges = Adjacency::from([
      (PersonId::new("c"), vec![edge(EdgeKind::Parent, "p")]),
    ]);
    assert_eq!(infer_event_types(&mut persons, &edges), 0);
  }

  #[test]
  fn spouse_death_outranks_sibling() {
    let mut persons = population(vec![
      person("a", "Ann", Gender::Female, &[("", "1950")]),
      person("b", "Bea", Gender::Female, &[("Death", "1950")]),
      person("h", "Hal", Gender::Male, &[("Death", "1950")]),
      person("m", "", Gender::Female, &[]),
    ]);
    let edges = Adjacency::from([
      (PersonId::new("a"), vec![edge(EdgeKind::Parent, "m"), edge(EdgeKind::Spouse, "h")]),
      (PersonId::new("b"), vec![edge(EdgeKind::Parent, "m")]),
    ]);

    infer_event_types(&mut persons, &edges);
    assert_eq!(persons[&PersonId::new("a")].events[0].kind, "Death of husband Hal");
  }

  #[test]
  fn unnamed_relation_uses_id() {
    let mut persons = population(vec![
      person("a", "Ann", Gender::Female, &[("", "1950")]),
      person("m", "", Gender::Unknown, &[("DEATH", "1950")]),
    ]);
    let edges = Adjacency::from([
      (PersonId::new("a"), vec![edge(EdgeKind::Parent, "m")]),
    ]);

    infer_event_types(&mut persons, &edges);
    assert_eq!(persons[&PersonId::new("a")].events[0].kind, "Death of parent m");
  }

  #[test]
  fn mutual_spouses_label_each_other() {
    let mut persons = population(vec![
      person("a", "Ann", Gender::Female, &[("", "1950"), ("Death", "1960")]),
      person("b", "Bob", Gender::Male, &[("", "1960"), ("Death", "1950")]),
    ]);
    let edges = Adjacency::from([
      (PersonId::new("a"), vec![edge(EdgeKind::Spouse, "b")]),
      (PersonId::new("b"), vec![edge(EdgeKind::Spouse, "a")]),
    ]);

    assert_eq!(infer_event_types(&mut persons, &edges), 2);
    assert_eq!(persons[&PersonId::new("a")].events[0].kind, "Death of husband Bob");
    assert_eq!(persons[&PersonId::new("b")].events[0].kind, "Death of wife Ann");
  }

  #[test]
  fn typed_events_untouched() {
    let mut persons = population(vec![
      person("a", "Ann", Gender::Female, &[("Residence", "1950")]),
      person("h", "Hal", Gender::Male, &[("Death", "1950")]),
    ]);
    let edges = Adjacency::from([
      (PersonId::new("a"), vec![edge(EdgeKind::Spouse, "h")]),
    ]);

    assert_eq!(infer_event_types(&mut persons, &edges), 0);
    assert_eq!(persons[&PersonId::new("a")].events[0].kind, "Residence");
  }
}
