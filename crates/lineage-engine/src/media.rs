//! Asset downloads and person-scoped media.
//!
//! Every download goes through [`Assets::obtain`], which consults the ledger
//! first. A key that has been stored once is reused without a network call.

use lineage_core::{
  citation::{AssetRequest, MediaAsset, MediaCategory, MediaKey},
  payload::RemoteMedia,
  person::Person,
  report::{FailureReport, FailureSubject, Stage},
  upstream::{MediaLedger, Upstream},
};
use tracing::{debug, warn};

use crate::{config::EngineConfig, throttle::Throttle};

const MAX_NAME_LEN: usize = 50;
const DEFAULT_EXT: &str = ".jpg";

// ─── File naming ─────────────────────────────────────────────────────────────

/// Make `name` safe as a file-name component.
pub fn sanitize_file_name(name: &str) -> String {
  name
    .chars()
    .filter_map(|c| match c {
      ' ' => Some('_'),
      '/' | '\\' | ':' => Some('-'),
      '*' | '?' | '"' | '<' | '>' | '|' | '.' => None,
      c => Some(c),
    })
    .take(MAX_NAME_LEN)
    .collect()
}

/// The last path segment of `url`, query string removed.
fn last_segment(url: &str) -> &str {
  let path = url.split(['?', '#']).next().unwrap_or_default();
  path.rsplit('/').next().unwrap_or_default()
}

/// Extension of the URL's last path segment including the dot, `.jpg` when
/// there is none.
pub fn extension_of(url: &str) -> &str {
  let segment = last_segment(url);
  match segment.rfind('.') {
    Some(at) if at + 1 < segment.len() => &segment[at..],
    _ => DEFAULT_EXT,
  }
}

/// `<citationId>_<file name from URL>`, or `<citationId>_record.jpg` when the
/// URL does not end in a file name.
pub fn citation_file_name(citation_id: &str, url: &str) -> String {
  let segment = last_segment(url);
  if segment.contains('.') {
    format!("{citation_id}_{segment}")
  } else {
    format!("{citation_id}_record{DEFAULT_EXT}")
  }
}

/// `<name>-<short id>[-<subcategory or title>]-<NNN><ext>`; `index` is
/// zero-based, the number in the name one-based.
pub fn person_media_file_name(
  person: &Person,
  item: &RemoteMedia,
  index: u32,
) -> String {
  let mut name = sanitize_file_name(&person.display_name);
  if name.is_empty() {
    name = "unknown".into();
  }
  let short = person.person_id.short();
  let ext = extension_of(&item.url);
  let label = [&item.subcategory, &item.title]
    .into_iter()
    .find(|s| !s.is_empty())
    .map(|s| sanitize_file_name(s));
  let number = index + 1;
  match label {
    Some(label) => format!("{name}-{short}-{label}-{number:03}{ext}"),
    None => format!("{name}-{short}-{number:03}{ext}"),
  }
}

// ─── Obtaining assets ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obtained {
  Reused(MediaAsset),
  Downloaded(MediaAsset),
}

impl Obtained {
  pub fn into_asset(self) -> MediaAsset {
    match self {
      Self::Reused(a) | Self::Downloaded(a) => a,
    }
  }
}

/// Person-scoped media collected for one unit.
#[derive(Debug, Default)]
pub struct PersonMedia {
  pub assets:     Vec<MediaAsset>,
  pub downloaded: usize,
  pub reused:     usize,
}

/// Everything needed to download and record an asset.
pub struct Assets<'a, U, L> {
  pub upstream: &'a U,
  pub ledger:   &'a L,
  pub throttle: &'a Throttle,
  pub config:   &'a EngineConfig,
}

impl<U: Upstream, L: MediaLedger> Assets<'_, U, L> {
  /// Reuse the asset recorded under `request.key`, or download and store it.
  /// The error is a human-readable reason for the failure report.
  pub async fn obtain(&self, request: AssetRequest) -> Result<Obtained, String> {
    if let Some(asset) = self.recorded(&request.key).await? {
      return Ok(Obtained::Reused(asset));
    }

    let bytes = self
      .throttle
      .retry("asset", self.config.asset_attempts, self.config.asset_backoff(), || {
        self.upstream.fetch_citation_asset(request.remote_ref.clone())
      })
      .await
      .map_err(|e| {
        format!(
          "download failed after {} attempt(s): {e}",
          self.config.asset_attempts
        )
      })?;

    let asset = self
      .ledger
      .store_asset(request, bytes)
      .await
      .map_err(|e| format!("could not store asset: {e}"))?;
    debug!(key = %asset.key, bytes = asset.byte_len, "asset stored");
    Ok(Obtained::Downloaded(asset))
  }

  /// The asset already recorded under `key`, without touching the network.
  pub async fn recorded(&self, key: &MediaKey) -> Result<Option<MediaAsset>, String> {
    let asset = self
      .ledger
      .find_asset(key.clone())
      .await
      .map_err(|e| format!("ledger lookup failed: {e}"))?;
    if asset.is_some() {
      debug!(%key, "asset already recorded");
    }
    Ok(asset)
  }

  /// List and obtain every media item attached to `person`. Items that fail
  /// are reported; the rest are kept in upstream order.
  pub async fn person_media(
    &self,
    person: &Person,
    report: &mut FailureReport,
  ) -> PersonMedia {
    let person_id = &person.person_id;
    self.throttle.ready().await;
    let items = match self.upstream.fetch_person_media(person_id.clone()).await {
      Ok(items) => items,
      Err(e) => {
        warn!(%person_id, error = %e, "media listing failed");
        report.degraded(Stage::PersonMedia, person_id, format!("media listing failed: {e}"));
        return PersonMedia::default();
      }
    };

    let mut out = PersonMedia::default();
    for (index, item) in (0u32..).zip(items.iter()) {
      let key = MediaKey::person(person_id.clone(), index);
      if item.url.trim().is_empty() {
        report.anomaly(
          Stage::PersonMedia,
          FailureSubject::Media(key),
          "media item has no url",
        );
        continue;
      }

      let request = AssetRequest {
        key:        key.clone(),
        remote_ref: item.url.clone(),
        category:   MediaCategory::from_upstream(&item.category),
        file_name:  person_media_file_name(person, item, index),
        title:      (!item.title.is_empty()).then(|| item.title.clone()),
      };
      match self.obtain(request).await {
        Ok(Obtained::Reused(asset)) => {
          out.reused += 1;
          out.assets.push(asset);
        }
        Ok(Obtained::Downloaded(asset)) => {
          out.downloaded += 1;
          out.assets.push(asset);
        }
        Err(reason) => {
          warn!(%person_id, %key, %reason, "person media not obtained");
          report.asset(Stage::PersonMedia, key, reason);
        }
      }
    }
    out
  }
}
