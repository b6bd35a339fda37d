//! Citations and downloaded media.
//!
//! A citation is identified by an ID that is unique across the whole run, not
//! per person. Persons only list the IDs they reference; the canonical record
//! lives once in the citation index.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, person::PersonId};

// ─── Citation ────────────────────────────────────────────────────────────────

/// Source-record metadata as found on a detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
  pub citation_id: String,
  pub title:       String,
  pub database_id: Option<String>,
  pub record_id:   Option<String>,
  pub source_id:   Option<String>,
  /// Remote reference of the full-size record image, if any.
  pub image_ref:   Option<String>,
}

/// A materialised citation: metadata plus the local asset, when the image
/// could be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
  pub record:      CitationRecord,
  /// `None` when the citation has no image or the download failed.
  pub local_asset: Option<MediaAsset>,
}

impl Citation {
  pub fn citation_id(&self) -> &str { &self.record.citation_id }
}

// ─── Media keys ──────────────────────────────────────────────────────────────

/// Identity of a downloaded asset. A key that has been stored once is never
/// downloaded again.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum MediaKey {
  Person { person_id: PersonId, index: u32 },
  Citation { citation_id: String },
}

impl MediaKey {
  pub fn person(person_id: PersonId, index: u32) -> Self {
    Self::Person { person_id, index }
  }

  pub fn citation(citation_id: impl Into<String>) -> Self {
    Self::Citation { citation_id: citation_id.into() }
  }
}

/// Compact text form used as a storage key:
/// `person:<index>:<id>` or `citation:<id>`.
impl fmt::Display for MediaKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Person { person_id, index } => {
        write!(f, "person:{index}:{person_id}")
      }
      Self::Citation { citation_id } => write!(f, "citation:{citation_id}"),
    }
  }
}

impl FromStr for MediaKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if let Some(id) = s.strip_prefix("citation:") {
      return Ok(Self::citation(id));
    }
    let unknown = || Error::UnknownMediaKey(s.to_owned());
    let rest = s.strip_prefix("person:").ok_or_else(unknown)?;
    let (index, id) = rest.split_once(':').ok_or_else(unknown)?;
    let index = index.parse().map_err(|_| unknown())?;
    Ok(Self::person(PersonId::new(id), index))
  }
}

// ─── Assets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
  Photo,
  Document,
  Record,
}

impl MediaCategory {
  /// Upstream `document` and `story` items are documents; everything else
  /// attached to a person is a photo.
  pub fn from_upstream(category: &str) -> Self {
    match category {
      "document" | "story" => Self::Document,
      _ => Self::Photo,
    }
  }

  /// Directory, relative to the media root, that holds this category.
  pub fn dir(self) -> &'static str {
    match self {
      Self::Photo => "photos",
      Self::Document => "documents",
      Self::Record => "records",
    }
  }
}

/// A file that has been downloaded and recorded. No binary data lives here;
/// `path` is relative to the configured media directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
  pub key:          MediaKey,
  pub remote_ref:   String,
  pub category:     MediaCategory,
  pub path:         String,
  /// SHA-256 hex digest of the file contents.
  pub content_hash: String,
  pub byte_len:     u64,
  pub title:        Option<String>,
  pub recorded_at:  DateTime<Utc>,
}

/// What the caller knows about an asset before it is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
  pub key:        MediaKey,
  pub remote_ref: String,
  pub category:   MediaCategory,
  pub file_name:  String,
  pub title:      Option<String>,
}

impl AssetRequest {
  /// Path of the stored file, relative to the media directory.
  pub fn relative_path(&self) -> String {
    format!("{}/{}", self.category.dir(), self.file_name)
  }

  /// The record for `bytes` downloaded for this request, stamped now.
  pub fn to_asset(&self, bytes: &[u8]) -> MediaAsset {
    MediaAsset {
      key:          self.key.clone(),
      remote_ref:   self.remote_ref.clone(),
      category:     self.category,
      path:         self.relative_path(),
      content_hash: content_hash(bytes),
      byte_len:     bytes.len() as u64,
      title:        self.title.clone(),
      recorded_at:  Utc::now(),
    }
  }
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String { hex::encode(Sha256::digest(bytes)) }
