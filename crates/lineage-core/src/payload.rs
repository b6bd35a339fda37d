//! Typed upstream payloads.
//!
//! The catalog and the relationship view describe people with the same record
//! shape. Fields the engine does not use are ignored; every field is optional
//! because the upstream omits freely.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  event::{Event, EventDate, KindSource},
  person::{Gender, Person, PersonId},
};

/// Wrapper the upstream uses for ids: `{"v": "<id>"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gid {
  #[serde(default)]
  pub v: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteName {
  #[serde(default, rename = "g")]
  pub given:   String,
  #[serde(default, rename = "s")]
  pub surname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteGender {
  #[serde(default, rename = "g")]
  pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
  #[serde(default, rename = "t")]
  pub kind:        String,
  #[serde(default, rename = "d")]
  pub date:        Value,
  /// Nested place structure; each part's `v` is one place component.
  #[serde(default)]
  pub nps:         Vec<Map<String, Value>>,
  #[serde(default, rename = "desc")]
  pub description: String,
}

impl RemoteEvent {
  /// Place components joined with `", "`; `None` when there are none.
  pub fn place(&self) -> Option<String> {
    let parts: Vec<&str> = self
      .nps
      .iter()
      .filter_map(|p| p.get("v").and_then(Value::as_str))
      .filter(|v| !v.is_empty())
      .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
  }

  pub fn to_event(&self) -> Event {
    let kind = self.kind.trim().to_owned();
    Event {
      kind_source: (!kind.is_empty()).then_some(KindSource::Graph),
      kind,
      date: EventDate::from_value(&self.date),
      place: self.place(),
      description: non_empty(&self.description),
    }
  }
}

/// A family-member reference on a person record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
  /// `F`, `M`, `H`, `W` or `C`.
  #[serde(default, rename = "t")]
  pub code:   String,
  #[serde(default, rename = "tgid")]
  pub target: Gid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemotePerson {
  #[serde(default)]
  pub gid:       Option<Gid>,
  /// Legacy flat id, preferred over `gid` when present.
  #[serde(default)]
  pub pid:       Option<String>,
  #[serde(default, rename = "Names")]
  pub names:     Vec<RemoteName>,
  #[serde(default, rename = "Genders")]
  pub genders:   Vec<RemoteGender>,
  #[serde(default, rename = "Events")]
  pub events:    Vec<RemoteEvent>,
  #[serde(default, rename = "Family")]
  pub family:    Vec<FamilyMember>,
  #[serde(default, rename = "isLiving")]
  pub is_living: bool,
  #[serde(default, rename = "gname")]
  pub given:     String,
  #[serde(default, rename = "sname")]
  pub surname:   String,
  #[serde(default)]
  pub gender:    String,
}

impl RemotePerson {
  pub fn person_id(&self) -> Option<PersonId> {
    let pid = self.pid.as_deref().filter(|p| !p.is_empty());
    let gid = self.gid.as_ref().and_then(|g| g.v.as_deref());
    pid.or(gid).filter(|id| !id.is_empty()).map(PersonId::from)
  }

  /// `(given, surname)` from the structured name, falling back to the flat
  /// fields when the structured name is blank.
  fn name_parts(&self) -> (&str, &str) {
    if let Some(n) = self.names.first()
      && (!n.given.is_empty() || !n.surname.is_empty())
    {
      return (n.given.as_str(), n.surname.as_str());
    }
    (self.given.as_str(), self.surname.as_str())
  }

  pub fn display_name(&self) -> String {
    let (given, surname) = self.name_parts();
    format!("{given} {surname}").trim().to_owned()
  }

  pub fn gender(&self) -> Gender {
    if !self.gender.is_empty() {
      return Gender::from_tag(&self.gender);
    }
    self
      .genders
      .first()
      .map(|g| Gender::from_tag(&g.tag))
      .unwrap_or_default()
  }

  pub fn events(&self) -> Vec<Event> {
    self.events.iter().map(RemoteEvent::to_event).collect()
  }

  /// Build a domain [`Person`] from this record.
  pub fn to_person(&self) -> Result<Person> {
    let person_id = self.person_id().ok_or(Error::MissingPersonId)?;
    let (given, surname) = self.name_parts();
    let mut person = Person::new(person_id, self.display_name());
    person.given_name = non_empty(given);
    person.surname = non_empty(surname);
    person.gender = self.gender();
    person.living = self.is_living;
    person.events = self.events();
    Ok(person)
  }
}

/// Response of the immediate-family relationship query for one focal person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyView {
  #[serde(default, rename = "Persons")]
  pub persons: Vec<RemotePerson>,
}

/// A person-scoped media item as listed by the upstream media viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMedia {
  #[serde(default)]
  pub url:         String,
  #[serde(default)]
  pub title:       String,
  #[serde(default)]
  pub category:    String,
  #[serde(default)]
  pub subcategory: String,
  #[serde(default)]
  pub description: String,
}

fn non_empty(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_owned())
}
