//! Per-person detail refinement.
//!
//! The detail page embeds a data blob after a fixed marker. It is
//! authoritative for place, description and citation references, and may
//! supply an event type where the graph left one blank. A page without the
//! marker simply has nothing to add.

use std::{borrow::Cow, collections::HashSet};

use lineage_core::{
  citation::CitationRecord,
  event::{Event, EventDate, KindSource},
  person::{Person, PersonId},
  upstream::Upstream,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::EngineConfig, scan, throttle::Throttle};

pub const RESEARCH_MARKER: &str = "window.researchData = ";

const CUSTOM_EVENT: &str = "CustomEvent";

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ResearchData {
  #[serde(default, rename = "PersonFacts")]
  facts:   Vec<PersonFact>,
  #[serde(default, rename = "PersonSources")]
  sources: Vec<PersonSource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PersonFact {
  #[serde(default)]
  type_string:         String,
  #[serde(default)]
  title:               String,
  #[serde(default)]
  place:               String,
  #[serde(default)]
  description:         String,
  #[serde(default)]
  date:                Value,
  #[serde(default, rename = "SourceCitationIDs")]
  source_citation_ids: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PersonSource {
  #[serde(default)]
  citation_id:      String,
  #[serde(default)]
  database_id:      String,
  #[serde(default)]
  record_id:        String,
  #[serde(default)]
  source_id:        String,
  #[serde(default)]
  title:            String,
  #[serde(default)]
  record_image_url: String,
}

impl PersonFact {
  /// Facts with no type, place or description carry nothing to merge.
  fn is_noise(&self) -> bool {
    self.type_string.trim().is_empty()
      && self.place.trim().is_empty()
      && self.description.trim().is_empty()
  }

  fn to_event(&self) -> Event {
    let kind = if self.type_string == CUSTOM_EVENT && !self.title.trim().is_empty() {
      self.title.trim()
    } else {
      self.type_string.trim()
    };
    Event {
      kind:        kind.to_owned(),
      kind_source: (!kind.is_empty()).then_some(KindSource::Detail),
      date:        EventDate::from_value(&self.date),
      place:       non_empty(&self.place),
      description: non_empty(&self.description),
    }
  }

  /// Citation IDs arrive as one comma/space separated string or as an array
  /// of such strings.
  fn citation_ids(&self) -> Vec<&str> {
    match &self.source_citation_ids {
      Value::String(s) => split_ids(s).collect(),
      Value::Array(items) => items
        .iter()
        .filter_map(Value::as_str)
        .flat_map(split_ids)
        .collect(),
      _ => Vec::new(),
    }
  }
}

impl PersonSource {
  fn to_record(&self) -> Option<CitationRecord> {
    let citation_id = self.citation_id.trim();
    if citation_id.is_empty() {
      return None;
    }
    Some(CitationRecord {
      citation_id: citation_id.to_owned(),
      title:       self.title.trim().to_owned(),
      database_id: non_empty(&self.database_id),
      record_id:   non_empty(&self.record_id),
      source_id:   non_empty(&self.source_id),
      image_ref:   non_empty(&self.record_image_url),
    })
  }
}

fn split_ids(s: &str) -> impl Iterator<Item = &str> {
  s.split(|c: char| c == ',' || c.is_whitespace())
    .filter(|id| !id.is_empty())
}

fn non_empty(s: &str) -> Option<String> {
  let s = s.trim();
  (!s.is_empty()).then(|| s.to_owned())
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// What a detail page contributes for one person.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailOutcome {
  /// Facts worth merging, in page order.
  pub facts:        Vec<Event>,
  /// Deduplicated, first-seen order.
  pub citation_ids: Vec<String>,
  pub sources:      Vec<CitationRecord>,
}

/// Some pages arrive as a JSON envelope whose `html` field holds the markup.
fn unwrap_html(blob: &str) -> Cow<'_, str> {
  if blob.trim_start().starts_with('{')
    && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(blob)
    && let Some(Value::String(html)) = map.get("html")
  {
    return Cow::Owned(html.clone());
  }
  Cow::Borrowed(blob)
}

/// Parse a detail page. `Ok(None)` when the page carries no data blob; an
/// error describes a blob that is present but unusable.
pub fn parse_blob(blob: &str) -> Result<Option<DetailOutcome>, String> {
  let html = unwrap_html(blob);
  let Some(object) =
    scan::extract_after(&html, RESEARCH_MARKER).map_err(|e| e.to_string())?
  else {
    return Ok(None);
  };
  let data: ResearchData = serde_json::from_str(object)
    .map_err(|e| format!("detail blob is not valid: {e}"))?;

  let mut seen = HashSet::new();
  let mut citation_ids = Vec::new();
  for fact in &data.facts {
    for id in fact.citation_ids() {
      if seen.insert(id) {
        citation_ids.push(id.to_owned());
      }
    }
  }

  Ok(Some(DetailOutcome {
    facts: data
      .facts
      .iter()
      .filter(|f| !f.is_noise())
      .map(PersonFact::to_event)
      .collect(),
    citation_ids,
    sources: data.sources.iter().filter_map(PersonSource::to_record).collect(),
  }))
}

// ─── Merging ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
  pub enriched: usize,
  pub appended: usize,
}

fn kinds_compatible(existing: &Event, fact: &Event) -> bool {
  existing.is_unclassified() || fact.is_unclassified() || existing.is_kind(&fact.kind)
}

/// Merge detail facts into `events`.
///
/// A fact enriches the first not-yet-matched event with the same date and a
/// compatible type: place and description come from the fact, and the fact's
/// type is taken only when the event has none. Facts matching nothing are
/// appended.
pub fn merge_facts(events: &mut Vec<Event>, facts: Vec<Event>) -> MergeStats {
  let mut stats = MergeStats::default();
  let mut matched = vec![false; events.len()];

  for fact in facts {
    let slot = fact.date.as_ref().and_then(|date| {
      events.iter().enumerate().position(|(i, e)| {
        !matched[i] && e.date.as_ref() == Some(date) && kinds_compatible(e, &fact)
      })
    });

    match slot {
      Some(i) => {
        let typed = !fact.is_unclassified();
        let event = &mut events[i];
        if fact.place.is_some() {
          event.place = fact.place;
        }
        if fact.description.is_some() {
          event.description = fact.description;
        }
        if event.is_unclassified() && typed {
          event.kind = fact.kind;
          event.kind_source = Some(KindSource::Detail);
        }
        matched[i] = true;
        stats.enriched += 1;
      }
      None => {
        events.push(fact);
        matched.push(true);
        stats.appended += 1;
      }
    }
  }
  stats
}

/// Apply a parsed detail page to a person.
pub fn apply(person: &mut Person, outcome: &DetailOutcome) -> MergeStats {
  let stats = merge_facts(&mut person.events, outcome.facts.clone());
  for id in &outcome.citation_ids {
    if !person.citation_ids.contains(id) {
      person.citation_ids.push(id.clone());
    }
  }
  stats
}

// ─── Fetching ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailFailure {
  /// Both attempts failed.
  Fetch(String),
  /// The page was fetched but its blob is unusable.
  Malformed(String),
}

pub struct DetailAugmenter<'a, U> {
  pub upstream: &'a U,
  pub throttle: &'a Throttle,
  pub config:   &'a EngineConfig,
}

impl<U: Upstream> DetailAugmenter<'_, U> {
  /// Fetch and parse the detail page of `person_id`. A failed first attempt
  /// is retried once after the cooldown, with the longer timeout.
  pub async fn fetch(
    &self,
    person_id: &PersonId,
  ) -> Result<Option<DetailOutcome>, DetailFailure> {
    let first = self.attempt(person_id, self.config.detail_timeout()).await;
    let blob = match first {
      Ok(blob) => blob,
      Err(e) => {
        warn!(%person_id, attempt = 1, error = %e, "detail fetch failed; cooling down");
        tokio::time::sleep(self.config.detail_cooldown()).await;
        self
          .attempt(person_id, self.config.detail_retry_timeout())
          .await
          .map_err(|e| {
            DetailFailure::Fetch(format!(
              "failed after 2 attempts, retry timeout {}s: {e}",
              self.config.detail_retry_timeout_secs
            ))
          })?
      }
    };

    let outcome = parse_blob(&blob).map_err(DetailFailure::Malformed)?;
    debug!(
      %person_id,
      facts = outcome.as_ref().map_or(0, |o| o.facts.len()),
      "detail fetched"
    );
    Ok(outcome)
  }

  async fn attempt(
    &self,
    person_id: &PersonId,
    timeout: std::time::Duration,
  ) -> Result<String, String> {
    self.throttle.ready().await;
    let call = self.upstream.fetch_detail_blob(person_id.clone(), timeout);
    match tokio::time::timeout(timeout, call).await {
      Ok(Ok(blob)) => Ok(blob),
      Ok(Err(e)) => Err(e.to_string()),
      Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
    }
  }
}
