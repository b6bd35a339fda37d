//! Events: dated occurrences in one person's life.
//!
//! Two sources contribute events: the relationship view (authoritative for
//! existence and date) and the detail page (authoritative for place and
//! description). The type of an event may be empty; the inferencer fills it in
//! from relational context but never overwrites a type a source supplied.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BIRTH: &str = "Birth";
pub const DEATH: &str = "Death";

// ─── Date ────────────────────────────────────────────────────────────────────

/// An opaque event date.
///
/// Upstream dates may be a bare year, a formatted string or a structured
/// object. They are never parsed; two dates are the same date when their
/// canonical text is equal.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventDate(String);

impl EventDate {
  pub fn new(text: impl Into<String>) -> Self { Self(text.into()) }

  /// Canonicalise a raw upstream value. `null`, blank strings and empty
  /// containers mean "no date".
  pub fn from_value(value: &Value) -> Option<Self> {
    let text = match value {
      Value::Null => return None,
      Value::String(s) => s.trim().to_owned(),
      Value::Number(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Array(a) if a.is_empty() => return None,
      Value::Object(o) if o.is_empty() => return None,
      other => other.to_string(),
    };
    (!text.is_empty()).then_some(Self(text))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Which stage supplied an event's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindSource {
  Graph,
  Detail,
  Inferred,
}

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  /// Empty when unclassified.
  pub kind:        String,
  pub kind_source: Option<KindSource>,
  pub date:        Option<EventDate>,
  pub place:       Option<String>,
  pub description: Option<String>,
}

impl Event {
  pub fn new(kind: impl Into<String>, date: Option<EventDate>) -> Self {
    Self {
      kind: kind.into(),
      kind_source: None,
      date,
      place: None,
      description: None,
    }
  }

  pub fn is_unclassified(&self) -> bool { self.kind.trim().is_empty() }

  /// Unclassified but dated: a candidate for type inference.
  pub fn is_inferable(&self) -> bool {
    self.is_unclassified() && self.date.is_some()
  }

  pub fn is_kind(&self, kind: &str) -> bool {
    self.kind.trim().eq_ignore_ascii_case(kind)
  }

  pub fn date_str(&self) -> Option<&str> {
    self.date.as_ref().map(EventDate::as_str)
  }
}
