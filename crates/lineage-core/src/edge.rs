//! Typed, directed relationship edges.
//!
//! Edges are stored as adjacency lists keyed by the source person's id, never
//! as references between person records. The graph is not symmetric: a parent
//! edge from A to B says nothing about B's child edges unless B was visited
//! too.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::person::PersonId;

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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EdgeKind {
  Parent,
  Spouse,
  Child,
}

impl EdgeKind {
  /// Map an upstream family-member code: `F`/`M` parent, `H`/`W` spouse,
  /// `C` child. Unknown codes yield `None`.
  pub fn from_family_code(code: &str) -> Option<Self> {
    match code.trim() {
      "F" | "M" => Some(Self::Parent),
      "H" | "W" => Some(Self::Spouse),
      "C" => Some(Self::Child),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
  pub kind:        EdgeKind,
  pub target:      PersonId,
  /// Name snapshot taken when the edge was built; not re-resolved later.
  pub target_name: String,
}
