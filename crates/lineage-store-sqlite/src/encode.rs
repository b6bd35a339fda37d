//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, media keys use their compact text form
//! and snapshots are stored as JSON.

use chrono::{DateTime, Utc};
use lineage_core::{
  citation::{Citation, CitationRecord, MediaAsset, MediaCategory, MediaKey},
  report::FailureReport,
  tree::ReconciledTree,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── MediaCategory ───────────────────────────────────────────────────────────

pub fn encode_category(c: MediaCategory) -> &'static str {
  match c {
    MediaCategory::Photo => "photo",
    MediaCategory::Document => "document",
    MediaCategory::Record => "record",
  }
}

pub fn decode_category(s: &str) -> Result<MediaCategory> {
  match s {
    "photo" => Ok(MediaCategory::Photo),
    "document" => Ok(MediaCategory::Document),
    "record" => Ok(MediaCategory::Record),
    other => Err(Error::UnknownCategory(other.to_owned())),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Raw values read directly from a `media_assets` row.
pub struct RawAsset {
  pub media_key:    String,
  pub remote_ref:   String,
  pub category:     String,
  pub path:         String,
  pub content_hash: String,
  pub byte_len:     i64,
  pub title:        Option<String>,
  pub recorded_at:  String,
}

pub const ASSET_COLUMNS: &str = "media_key, remote_ref, category, path, content_hash, \
                                 byte_len, title, recorded_at";

impl RawAsset {
  /// Read the [`ASSET_COLUMNS`] starting at column `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      media_key:    row.get(offset)?,
      remote_ref:   row.get(offset + 1)?,
      category:     row.get(offset + 2)?,
      path:         row.get(offset + 3)?,
      content_hash: row.get(offset + 4)?,
      byte_len:     row.get(offset + 5)?,
      title:        row.get(offset + 6)?,
      recorded_at:  row.get(offset + 7)?,
    })
  }

  pub fn into_asset(self) -> Result<MediaAsset> {
    Ok(MediaAsset {
      key:          self.media_key.parse::<MediaKey>()?,
      remote_ref:   self.remote_ref,
      category:     decode_category(&self.category)?,
      path:         self.path,
      content_hash: self.content_hash,
      byte_len:     self.byte_len.max(0) as u64,
      title:        self.title,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values of a `citations` row, with its asset when one is joined.
pub struct RawCitation {
  pub citation_id: String,
  pub title:       String,
  pub database_id: Option<String>,
  pub record_id:   Option<String>,
  pub source_id:   Option<String>,
  pub image_ref:   Option<String>,
  pub asset:       Option<RawAsset>,
}

impl RawCitation {
  pub fn into_citation(self) -> Result<Citation> {
    Ok(Citation {
      record:      CitationRecord {
        citation_id: self.citation_id,
        title:       self.title,
        database_id: self.database_id,
        record_id:   self.record_id,
        source_id:   self.source_id,
        image_ref:   self.image_ref,
      },
      local_asset: self.asset.map(RawAsset::into_asset).transpose()?,
    })
  }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

pub fn encode_tree(tree: &ReconciledTree) -> Result<String> {
  Ok(serde_json::to_string(tree)?)
}

pub fn decode_tree(s: &str) -> Result<ReconciledTree> { Ok(serde_json::from_str(s)?) }

pub fn encode_report(report: &FailureReport) -> Result<String> {
  Ok(serde_json::to_string(report)?)
}

pub fn decode_report(s: &str) -> Result<FailureReport> { Ok(serde_json::from_str(s)?) }
