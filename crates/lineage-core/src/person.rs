//! Person: a node of the reconciled tree.
//!
//! A person is created the first time any source mentions it and is never
//! removed; every stage of the engine merges into the same record.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::event::Event;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Vendor-assigned person identifier.
///
/// The full form carries tree context (`"232573524428:1030:197283789"`) and is
/// treated as opaque. Only the leading segment is ever extracted, for
/// addressing per-person endpoints and for file names.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// The text before the first `:`; the whole id when there is none.
  pub fn short(&self) -> &str {
    match self.0.find(':') {
      Some(idx) if idx > 0 => &self.0[..idx],
      _ => &self.0,
    }
  }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for PersonId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for PersonId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Gender ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
  #[default]
  Unknown,
}

impl Gender {
  /// Interpret an upstream gender tag (`"m"`, `"f"`, `"male"`, ...).
  /// Anything unrecognised is [`Gender::Unknown`].
  pub fn from_tag(tag: &str) -> Self {
    match tag.trim().to_ascii_lowercase().as_str() {
      "m" | "male" => Self::Male,
      "f" | "female" => Self::Female,
      _ => Self::Unknown,
    }
  }
}

// ─── Person ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub person_id:    PersonId,
  pub display_name: String,
  pub given_name:   Option<String>,
  pub surname:      Option<String>,
  pub gender:       Gender,
  pub living:       bool,
  pub events:       Vec<Event>,
  /// Citation IDs referenced by this person's facts, first-seen order.
  /// The canonical citation lives once in the tree's citation index.
  pub citation_ids: Vec<String>,
}

impl Person {
  pub fn new(person_id: PersonId, display_name: impl Into<String>) -> Self {
    Self {
      person_id,
      display_name: display_name.into(),
      given_name: None,
      surname: None,
      gender: Gender::Unknown,
      living: false,
      events: Vec::new(),
      citation_ids: Vec::new(),
    }
  }

  /// Name for labels and file names: the display name, or the raw id when the
  /// person has no known name.
  pub fn label_name(&self) -> &str {
    if self.display_name.is_empty() {
      self.person_id.as_str()
    } else {
      &self.display_name
    }
  }

  /// True when at least one event is unclassified but dated.
  pub fn has_unclassified_events(&self) -> bool {
    self.events.iter().any(Event::is_inferable)
  }
}
