//! End-to-end reconciliation against a scripted upstream.

use std::{
  collections::{BTreeSet, HashMap, HashSet},
  sync::Mutex,
  time::Duration,
};

use bytes::Bytes;
use lineage_core::{
  citation::MediaKey,
  event::KindSource,
  payload::{FamilyView, RemoteMedia, RemotePerson},
  person::PersonId,
  report::{FailureKind, FailureSubject, Stage},
  upstream::Upstream,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::{
  CatalogParams, EngineConfig, Error, MemoryLedger, Reconciler, detail::RESEARCH_MARKER,
};

// ─── Fake upstream ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct FakeError(String);

#[derive(Default)]
struct FakeUpstream {
  count:         Option<u32>,
  pages:         HashMap<u32, Vec<RemotePerson>>,
  failing_pages: HashSet<u32>,
  views:         HashMap<String, FamilyView>,
  blobs:         HashMap<String, String>,
  /// Number of leading detail calls that fail, per person.
  blob_failures: HashMap<String, usize>,
  assets:        HashMap<String, Bytes>,
  media:         HashMap<String, Vec<RemoteMedia>>,
  /// Cancel the token when the given call is made for the n-th time.
  cancel_on:     Option<(String, usize, CancellationToken)>,
  calls:         Mutex<Vec<String>>,
}

impl FakeUpstream {
  /// Catalog split into pages of `page_size`; every person's view holds the
  /// person and the family members that are themselves in `people`.
  fn new(people: Vec<RemotePerson>, page_size: usize) -> Self {
    let mut fake = Self { count: Some(people.len() as u32), ..Self::default() };
    for (i, chunk) in people.chunks(page_size).enumerate() {
      fake.pages.insert(i as u32 + 1, chunk.to_vec());
    }
    for p in &people {
      let targets: HashSet<&str> =
        p.family.iter().filter_map(|m| m.target.v.as_deref()).collect();
      let mut persons = vec![p.clone()];
      persons.extend(
        people
          .iter()
          .filter(|o| o.person_id().is_some_and(|id| targets.contains(id.as_str())))
          .cloned(),
      );
      fake.views.insert(p.person_id().unwrap().to_string(), FamilyView { persons });
    }
    fake
  }

  fn detail(mut self, id: &str, facts: Value, sources: Value) -> Self {
    let data = json!({"PersonFacts": facts, "PersonSources": sources});
    self
      .blobs
      .insert(id.into(), format!("<script>{RESEARCH_MARKER}{data};</script>"));
    self
  }

  /// Log a call and return how many times this exact call has been made.
  fn log(&self, call: String) -> usize {
    let mut calls = self.calls.lock().unwrap();
    calls.push(call.clone());
    let n = calls.iter().filter(|c| **c == call).count();
    if let Some((trigger, at, cancel)) = &self.cancel_on
      && *trigger == call
      && *at == n
    {
      cancel.cancel();
    }
    n
  }

  fn calls_to(&self, prefix: &str) -> Vec<String> {
    let calls = self.calls.lock().unwrap();
    calls.iter().filter(|c| c.starts_with(prefix)).cloned().collect()
  }
}

impl Upstream for FakeUpstream {
  type Error = FakeError;

  async fn fetch_catalog_count(&self) -> Result<u32, FakeError> {
    self.log("count".into());
    self.count.ok_or_else(|| FakeError("count unavailable".into()))
  }

  async fn fetch_catalog_page(
    &self,
    page: u32,
    _page_size: u32,
  ) -> Result<Vec<RemotePerson>, FakeError> {
    self.log(format!("page:{page}"));
    if self.failing_pages.contains(&page) {
      return Err(FakeError(format!("page {page} unavailable")));
    }
    Ok(self.pages.get(&page).cloned().unwrap_or_default())
  }

  async fn fetch_relationships(&self, person_id: PersonId) -> Result<FamilyView, FakeError> {
    self.log(format!("relationships:{person_id}"));
    self
      .views
      .get(person_id.as_str())
      .cloned()
      .ok_or_else(|| FakeError(format!("no view for {person_id}")))
  }

  async fn fetch_detail_blob(
    &self,
    person_id: PersonId,
    _timeout: Duration,
  ) -> Result<String, FakeError> {
    let n = self.log(format!("detail:{person_id}"));
    if n <= self.blob_failures.get(person_id.as_str()).copied().unwrap_or(0) {
      return Err(FakeError("503 service unavailable".into()));
    }
    Ok(
      self
        .blobs
        .get(person_id.as_str())
        .cloned()
        .unwrap_or_else(|| "<html></html>".into()),
    )
  }

  async fn fetch_citation_asset(&self, remote_ref: String) -> Result<Bytes, FakeError> {
    self.log(format!("asset:{remote_ref}"));
    self
      .assets
      .get(&remote_ref)
      .cloned()
      .ok_or_else(|| FakeError(format!("404 for {remote_ref}")))
  }

  async fn fetch_person_media(
    &self,
    person_id: PersonId,
  ) -> Result<Vec<RemoteMedia>, FakeError> {
    self.log(format!("media:{person_id}"));
    Ok(self.media.get(person_id.as_str()).cloned().unwrap_or_default())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn person(
  id: &str,
  name: &str,
  gender: &str,
  events: &[(&str, &str)],
  family: &[(&str, &str)],
) -> RemotePerson {
  let (given, surname) = name.split_once(' ').unwrap_or((name, ""));
  serde_json::from_value(json!({
    "gid": {"v": id},
    "Names": [{"g": given, "s": surname}],
    "Genders": [{"g": gender}],
    "Events": events.iter().map(|(t, d)| json!({"t": t, "d": d})).collect::<Vec<_>>(),
    "Family": family
      .iter()
      .map(|(t, target)| json!({"t": t, "tgid": {"v": target}}))
      .collect::<Vec<_>>(),
  }))
  .unwrap()
}

fn config() -> EngineConfig {
  EngineConfig {
    requests_per_second: 10_000,
    page_backoff_ms: 0,
    detail_cooldown_secs: 0,
    asset_backoff_ms: 0,
    ..EngineConfig::default()
  }
}

fn reconciler(upstream: FakeUpstream) -> Reconciler<FakeUpstream, MemoryLedger> {
  Reconciler::new(upstream, MemoryLedger::new(), config()).unwrap()
}

fn id(s: &str) -> PersonId { PersonId::new(s) }

/// Three generations: P1 is P2's father, P2 is P3's mother.
fn three_generations(p2_death: &str) -> Vec<RemotePerson> {
  vec![
    person("P1", "Al Smith", "m", &[("Death", "1950")], &[("C", "P2")]),
    person("P2", "Mae Smith", "f", &[("Death", p2_death)], &[("F", "P1"), ("C", "P3")]),
    person("P3", "Tim Smith", "m", &[("", "1950")], &[("M", "P2")]),
  ]
}

// ─── Inference ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn parent_death_labels_blank_event() {
  let engine = reconciler(FakeUpstream::new(three_generations("1950"), 100));
  let (tree, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  let p3 = tree.person(&id("P3")).unwrap();
  assert_eq!(p3.events[0].kind, "Death of mother Mae Smith");
  assert_eq!(p3.events[0].kind_source, Some(KindSource::Inferred));
  assert_eq!(tree.stats.inferred_events, 1);
  assert!(report.is_clean(), "{report:?}");
}

#[tokio::test]
async fn grandparent_does_not_contribute() {
  let engine = reconciler(FakeUpstream::new(three_generations("1960"), 100));
  let (tree, _) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert!(tree.person(&id("P3")).unwrap().events[0].is_unclassified());
  assert_eq!(tree.stats.inferred_events, 0);
}

#[tokio::test]
async fn source_types_are_never_overwritten() {
  let people = vec![
    person("P1", "Ann Lee", "f", &[("Residence", "1950"), ("", "1950")], &[("H", "P2")]),
    person("P2", "Hal Lee", "m", &[("Death", "1950")], &[("W", "P1")]),
  ];
  let fake = FakeUpstream::new(people, 100)
    .detail("P1", json!([{"TypeString": "Burial", "Date": "1950"}]), json!([]));
  let (tree, _) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  let p1 = tree.person(&id("P1")).unwrap();
  assert_eq!(p1.events[0].kind, "Residence");
  assert_eq!(p1.events[0].kind_source, Some(KindSource::Graph));
  // The blank event took the detail page's type before inference ran.
  assert_eq!(p1.events[1].kind, "Burial");
  assert_eq!(p1.events[1].kind_source, Some(KindSource::Detail));
  assert_eq!(tree.stats.inferred_events, 0);
}

// ─── Relationships ───────────────────────────────────────────────────────────

#[tokio::test]
async fn edges_and_accessors() {
  let engine = reconciler(FakeUpstream::new(three_generations("1950"), 100));
  let (tree, _) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert_eq!(tree.parents_of(&id("P2"))[0].target, id("P1"));
  assert_eq!(tree.children_of(&id("P2"))[0].target_name, "Tim Smith");
  assert!(tree.spouses_of(&id("P2")).is_empty());
  assert_eq!(tree.stats.edges, 4);
}

#[tokio::test]
async fn unusable_view_is_an_anomaly() {
  let mut fake = FakeUpstream::new(three_generations("1950"), 100);
  fake.views.insert("P1".into(), FamilyView::default());
  let (tree, report) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  assert!(tree.edges_of(&id("P1")).is_empty());
  assert!(tree.person(&id("P1")).is_some());
  let anomaly = report.of_kind(FailureKind::DataAnomaly).next().unwrap();
  assert_eq!(anomaly.stage, Stage::Relationships);
  assert_eq!(anomaly.subject, FailureSubject::Person(id("P1")));
}

// ─── Citations ───────────────────────────────────────────────────────────────

fn citing(fake: FakeUpstream, ids: &[&str], citation: &str, image: &str) -> FakeUpstream {
  ids.iter().fold(fake, |fake, pid| {
    fake.detail(
      pid,
      json!([{"TypeString": "Death", "Date": "1950", "SourceCitationIDs": citation}]),
      json!([{"CitationId": citation, "Title": "Parish register", "RecordImageUrl": image}]),
    )
  })
}

#[tokio::test]
async fn failed_citation_image_keeps_metadata() {
  let image = "https://img/records/c100.jpg";
  let fake = citing(
    FakeUpstream::new(three_generations("1950"), 100),
    &["P1", "P2"],
    "C100",
    image,
  );
  let engine = reconciler(fake);
  let (tree, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  let citation = tree.citation("C100").unwrap();
  assert_eq!(citation.record.title, "Parish register");
  assert!(citation.local_asset.is_none());
  for pid in ["P1", "P2"] {
    assert_eq!(tree.person(&id(pid)).unwrap().citation_ids, vec!["C100"]);
  }
  // One materialisation, with its configured attempts.
  assert_eq!(engine.upstream().calls_to("asset:").len(), 2);
  let failures: Vec<_> = report.of_kind(FailureKind::DegradedAsset).collect();
  assert_eq!(failures.len(), 1);
  assert_eq!(failures[0].subject, FailureSubject::Media(MediaKey::citation("C100")));
}

#[tokio::test]
async fn shared_citation_downloaded_once() {
  let image = "https://img/records/c7.jpg";
  let mut fake = citing(
    FakeUpstream::new(three_generations("1950"), 100),
    &["P1", "P2", "P3"],
    "C7",
    image,
  );
  fake.assets.insert(image.into(), Bytes::from_static(b"jpeg"));
  let engine = reconciler(fake);
  let (tree, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert_eq!(engine.upstream().calls_to("asset:").len(), 1);
  assert_eq!(engine.ledger().stored_count(), 1);
  let asset = tree.citation("C7").unwrap().local_asset.as_ref().unwrap();
  assert_eq!(asset.path, "records/C7_c7.jpg");
  assert_eq!(tree.stats.citations, 1);
  assert_eq!(tree.stats.assets_downloaded, 1);
  assert_eq!(engine.ledger().citations().await.len(), 1);
  assert!(report.is_clean(), "{report:?}");
}

#[tokio::test]
async fn citation_without_source_record() {
  let fake = FakeUpstream::new(three_generations("1950"), 100).detail(
    "P1",
    json!([{"TypeString": "Birth", "Date": "1900", "SourceCitationIDs": "C9"}]),
    json!([]),
  );
  let (tree, report) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  assert_eq!(tree.person(&id("P1")).unwrap().citation_ids, vec!["C9"]);
  assert!(tree.citation("C9").is_none());
  let anomaly = report.of_kind(FailureKind::DataAnomaly).next().unwrap();
  assert_eq!(anomaly.subject, FailureSubject::Citation("C9".into()));
}

#[tokio::test]
async fn rerun_reuses_assets_and_converges() {
  let image = "https://img/records/c7.jpg";
  let mut fake = citing(
    FakeUpstream::new(three_generations("1950"), 100),
    &["P1", "P3"],
    "C7",
    image,
  );
  fake.assets.insert(image.into(), Bytes::from_static(b"jpeg"));
  let engine = reconciler(fake);

  let (first, _) = engine.reconcile(CatalogParams::default()).await.unwrap();
  let (second, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert!(first.same_content(&second));
  assert_ne!(first.run_id, second.run_id);
  assert_eq!(engine.upstream().calls_to("asset:").len(), 1);
  assert_eq!(second.stats.assets_downloaded, 0);
  assert_eq!(second.stats.assets_reused, 1);
  assert!(report.is_clean());
}

// ─── Detail ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_blob_keeps_graph_data() {
  let mut fake = FakeUpstream::new(three_generations("1950"), 100);
  fake.blobs.insert(
    "P2".into(),
    format!(r#"<script>{RESEARCH_MARKER}{{"PersonFacts": [{{"Place": "Lon"#),
  );
  let (tree, report) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  let p2 = tree.person(&id("P2")).unwrap();
  assert_eq!(p2.events[0].kind, "Death");
  assert_eq!(p2.events[0].place, None);
  let anomaly = report.of_kind(FailureKind::DataAnomaly).next().unwrap();
  assert_eq!(anomaly.stage, Stage::Detail);
  assert_eq!(anomaly.subject, FailureSubject::Person(id("P2")));
}

#[tokio::test]
async fn detail_enriches_place() {
  let fake = FakeUpstream::new(three_generations("1950"), 100).detail(
    "P2",
    json!([
      {"TypeString": "Death", "Date": "1950", "Place": "Leeds, England"},
      {"TypeString": "CustomEvent", "Title": "Emigration", "Date": "1920"},
      {"TypeString": "", "Place": "", "Description": "", "Date": "1930"}
    ]),
    json!([]),
  );
  let (tree, _) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  let p2 = tree.person(&id("P2")).unwrap();
  assert_eq!(p2.events.len(), 2);
  assert_eq!(p2.events[0].place.as_deref(), Some("Leeds, England"));
  assert_eq!(p2.events[1].kind, "Emigration");
}

#[tokio::test]
async fn detail_retried_once_after_failure() {
  let mut fake = FakeUpstream::new(three_generations("1950"), 100);
  fake.blob_failures.insert("P1".into(), 1);
  let engine = reconciler(fake);
  let (_, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert_eq!(engine.upstream().calls_to("detail:P1").len(), 2);
  assert!(report.degraded_entities(None).is_empty());
}

#[tokio::test]
async fn failed_units_degrade_without_aborting() {
  let mut fake = FakeUpstream::new(three_generations("1950"), 100);
  fake.blob_failures.insert("P1".into(), 2);
  fake.blob_failures.insert("P3".into(), 2);
  fake.views.remove("P2");
  let (tree, report) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  assert_eq!(tree.persons.len(), 3);
  assert_eq!(
    report.degraded_entities(Some(Stage::Detail)),
    BTreeSet::from([id("P1"), id("P3")])
  );
  assert_eq!(
    report.degraded_entities(Some(Stage::Relationships)),
    BTreeSet::from([id("P2")])
  );
  // P2 still carries its catalog events.
  assert_eq!(tree.person(&id("P2")).unwrap().events[0].kind, "Death");

  let detail = report
    .of_kind(FailureKind::DegradedEntity)
    .find(|f| f.subject == FailureSubject::Person(id("P1")))
    .unwrap();
  assert_eq!(
    detail.reason,
    "failed after 2 attempts, retry timeout 35s: 503 service unavailable"
  );
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

fn six_people() -> Vec<RemotePerson> {
  (1..=6)
    .map(|n| person(&format!("P{n}"), &format!("Person {n}"), "", &[], &[]))
    .collect()
}

#[tokio::test]
async fn missing_page_is_a_gap() {
  let mut fake = FakeUpstream::new(six_people(), 2);
  fake.failing_pages.insert(2);
  let engine = reconciler(fake);
  let params = CatalogParams { page_size: Some(2), resume: None };
  let (tree, report) = engine.reconcile(params).await.unwrap();

  let ids: Vec<_> = tree.persons.keys().map(PersonId::as_str).collect();
  assert_eq!(ids, vec!["P1", "P2", "P5", "P6"]);
  assert_eq!(report.gaps(), BTreeSet::from([2]));
  assert_eq!(engine.upstream().calls_to("page:2").len(), 3);
  assert_eq!(tree.catalog.missing_pages(), vec![2]);
}

#[tokio::test]
async fn resume_fetches_only_missing_pages() {
  let mut fake = FakeUpstream::new(six_people(), 2);
  fake.failing_pages.insert(2);
  let params = CatalogParams { page_size: Some(2), resume: None };
  let (first, _) = reconciler(fake).reconcile(params).await.unwrap();

  let engine = reconciler(FakeUpstream::new(six_people(), 2));
  let (tree, report) =
    engine.reconcile(CatalogParams::resume(first.catalog)).await.unwrap();

  assert_eq!(engine.upstream().calls_to("page:"), vec!["page:2"]);
  assert_eq!(tree.persons.len(), 6);
  assert!(tree.catalog.is_complete());
  assert!(report.gaps().is_empty());
}

#[tokio::test]
async fn duplicate_catalog_entries_merge() {
  let people = six_people();
  let mut fake = FakeUpstream::new(people.clone(), 100);
  fake.count = Some(4);
  fake.pages = HashMap::from([
    (1, vec![people[0].clone(), people[1].clone()]),
    (2, vec![people[1].clone(), people[2].clone()]),
  ]);
  let params = CatalogParams { page_size: Some(2), resume: None };
  let (tree, _) = reconciler(fake).reconcile(params).await.unwrap();

  assert_eq!(tree.persons.len(), 3);
  assert_eq!(tree.catalog.roster.len(), 3);
}

#[tokio::test]
async fn count_failure_is_fatal() {
  let mut fake = FakeUpstream::new(six_people(), 2);
  fake.count = None;
  let err = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap_err();
  assert!(matches!(err, Error::CatalogCount(_)));
}

#[test]
fn invalid_config_rejected() {
  let config = EngineConfig { workers: 0, ..config() };
  let result = Reconciler::new(FakeUpstream::default(), MemoryLedger::new(), config);
  assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

// ─── Cancellation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_run_keeps_catalog_data() {
  let (complete, _) = reconciler(FakeUpstream::new(three_generations("1950"), 100))
    .reconcile(CatalogParams::default())
    .await
    .unwrap();

  let cancel = CancellationToken::new();
  let engine = reconciler(FakeUpstream::new(three_generations("1950"), 100))
    .with_cancellation(cancel.clone());
  cancel.cancel();
  let (tree, report) =
    engine.reconcile(CatalogParams::resume(complete.catalog)).await.unwrap();

  assert!(report.cancelled);
  assert_eq!(tree.persons.len(), 3);
  assert_eq!(report.of_kind(FailureKind::Cancelled).count(), 3);
  assert!(engine.upstream().calls_to("relationships:").is_empty());
  assert!(tree.edges.is_empty());
  assert_eq!(tree.person(&id("P2")).unwrap().display_name, "Mae Smith");
}

/// C7 cited by P1 and P3; the token fires during the `nth` detail call for
/// P1. With one worker P1's unit completes and P2 and P3 never start.
fn cancelling_engine(nth: usize) -> Reconciler<FakeUpstream, MemoryLedger> {
  let image = "https://img/records/c7.jpg";
  let cancel = CancellationToken::new();
  let mut fake = citing(
    FakeUpstream::new(three_generations("1950"), 100),
    &["P1", "P3"],
    "C7",
    image,
  );
  fake.assets.insert(image.into(), Bytes::from_static(b"jpeg"));
  fake.cancel_on = Some(("detail:P1".into(), nth, cancel.clone()));
  let config = EngineConfig { workers: 1, ..config() };
  Reconciler::new(fake, MemoryLedger::new(), config)
    .unwrap()
    .with_cancellation(cancel)
}

#[tokio::test]
async fn cancelled_mid_run_reuses_recorded_citation_asset() {
  let engine = cancelling_engine(2);
  let (first, report) = engine.reconcile(CatalogParams::default()).await.unwrap();
  assert!(report.is_clean(), "{report:?}");
  let recorded = first.citation("C7").unwrap().local_asset.clone().unwrap();

  let (second, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert!(report.cancelled);
  assert_eq!(second.citation("C7").unwrap().local_asset, Some(recorded));
  assert_eq!(second.stats.assets_reused, 1);
  assert_eq!(engine.upstream().calls_to("asset:").len(), 1);
  let cancelled: Vec<_> = report.of_kind(FailureKind::Cancelled).collect();
  assert_eq!(cancelled.len(), 2);
  assert!(cancelled.iter().all(|f| f.stage == Stage::Scheduling));
}

#[tokio::test]
async fn cancelled_mid_run_reports_skipped_citation_download() {
  let engine = cancelling_engine(1);
  let (tree, report) = engine.reconcile(CatalogParams::default()).await.unwrap();

  assert!(report.cancelled);
  let citation = tree.citation("C7").unwrap();
  assert_eq!(citation.record.title, "Parish register");
  assert!(citation.local_asset.is_none());
  assert!(engine.upstream().calls_to("asset:").is_empty());
  let skipped: Vec<_> = report
    .of_kind(FailureKind::Cancelled)
    .filter(|f| f.stage == Stage::Citations)
    .collect();
  assert_eq!(skipped.len(), 1);
  assert_eq!(skipped[0].subject, FailureSubject::Media(MediaKey::citation("C7")));
}

// ─── Person media ────────────────────────────────────────────────────────────

#[tokio::test]
async fn person_media_failures_are_per_item() {
  let mut fake = FakeUpstream::new(three_generations("1950"), 100);
  fake.media.insert("P1".into(), vec![
    RemoteMedia {
      url: "https://m/p1.png".into(),
      title: "Portrait".into(),
      category: "photo".into(),
      ..RemoteMedia::default()
    },
    RemoteMedia { url: "https://m/missing.pdf".into(), ..RemoteMedia::default() },
  ]);
  fake.assets.insert("https://m/p1.png".into(), Bytes::from_static(b"png"));
  let (tree, report) = reconciler(fake).reconcile(CatalogParams::default()).await.unwrap();

  let media = tree.media_of(&id("P1"));
  assert_eq!(media.len(), 1);
  assert_eq!(media[0].path, "photos/Al_Smith-P1-Portrait-001.png");
  assert_eq!(media[0].key, MediaKey::person(id("P1"), 0));
  let failure = report.of_kind(FailureKind::DegradedAsset).next().unwrap();
  assert_eq!(failure.stage, Stage::PersonMedia);
  assert_eq!(failure.subject, FailureSubject::Media(MediaKey::person(id("P1"), 1)));
}

#[tokio::test]
async fn person_media_can_be_disabled() {
  let fake = FakeUpstream::new(three_generations("1950"), 100);
  let config = EngineConfig { person_media: false, ..config() };
  let engine = Reconciler::new(fake, MemoryLedger::new(), config).unwrap();
  engine.reconcile(CatalogParams::default()).await.unwrap();
  assert!(engine.upstream().calls_to("media:").is_empty());
}
