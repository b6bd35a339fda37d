//! Relation labels used in inferred event types.

use lineage_core::person::Gender;

/// How a relation stands to the focal person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
  Child,
  Sibling,
  Parent,
  Spouse,
}

/// Gendered word for `relation`, neutral when the gender is unknown.
pub fn relation_label(relation: Relation, gender: Gender) -> &'static str {
  use Gender::*;
  use Relation::*;
  match (relation, gender) {
    (Child, Male) => "son",
    (Child, Female) => "daughter",
    (Child, Unknown) => "child",
    (Sibling, Male) => "brother",
    (Sibling, Female) => "sister",
    (Sibling, Unknown) => "sibling",
    (Parent, Male) => "father",
    (Parent, Female) => "mother",
    (Parent, Unknown) => "parent",
    (Spouse, Male) => "husband",
    (Spouse, Female) => "wife",
    (Spouse, Unknown) => "spouse",
  }
}

/// `"<event kind> of <relation label> <name>"`, e.g. `Death of wife Ann Lee`.
pub fn event_label(
  event_kind: &str,
  relation: Relation,
  gender: Gender,
  name: &str,
) -> String {
  format!("{event_kind} of {} {name}", relation_label(relation, gender))
}
