//! [`SqliteStore`]: the SQLite implementation of [`MediaLedger`], plus
//! snapshot persistence.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use lineage_core::{
  citation::{AssetRequest, Citation, MediaAsset, MediaKey},
  report::FailureReport,
  tree::ReconciledTree,
  upstream::MediaLedger,
};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{
    ASSET_COLUMNS, RawAsset, RawCitation, decode_report, decode_tree, encode_category,
    encode_dt, encode_report, encode_tree,
  },
  schema::SCHEMA,
};

/// A reconciled tree and its failure report, as saved after a run.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
  pub tree:   ReconciledTree,
  pub report: FailureReport,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Media ledger and snapshot store backed by a single SQLite file. Asset
/// files live under `media_dir`.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  media_dir: PathBuf,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, media_dir: impl Into<PathBuf>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, media_dir: media_dir.into() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory database; asset files still go to `media_dir`.
  pub async fn open_in_memory(media_dir: impl Into<PathBuf>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, media_dir: media_dir.into() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub fn media_dir(&self) -> &Path { &self.media_dir }

  /// Absolute location of a stored asset.
  pub fn asset_path(&self, asset: &MediaAsset) -> PathBuf { self.media_dir.join(&asset.path) }

  async fn get_asset(&self, key: &MediaKey) -> Result<Option<MediaAsset>> {
    let key_str = key.to_string();
    let raw: Option<RawAsset> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ASSET_COLUMNS} FROM media_assets WHERE media_key = ?1"),
            rusqlite::params![key_str],
            |row| RawAsset::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;
    raw.map(RawAsset::into_asset).transpose()
  }

  async fn write_file(&self, relative: &str, bytes: &[u8]) -> Result<()> {
    let path = self.media_dir.join(relative);
    let io = |source| Error::Io { path: path.clone(), source };
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await.map_err(io)?;
    }
    tokio::fs::write(&path, bytes).await.map_err(io)?;
    Ok(())
  }

  /// Number of recorded assets.
  pub async fn asset_count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM media_assets", [], |row| row.get(0))?)
      })
      .await?;
    Ok(n.max(0) as usize)
  }

  // ── Citations ─────────────────────────────────────────────────────────────

  pub async fn get_citation(&self, citation_id: &str) -> Result<Option<Citation>> {
    let id = citation_id.to_owned();
    let raw: Option<RawCitation> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT c.citation_id, c.title, c.database_id, c.record_id, c.source_id,
                  c.image_ref, a.{}
           FROM citations c
           LEFT JOIN media_assets a ON a.media_key = c.asset_key
           WHERE c.citation_id = ?1",
          ASSET_COLUMNS.replace(", ", ", a.")
        );
        Ok(conn
          .query_row(&sql, rusqlite::params![id], |row| {
            let asset_key: Option<String> = row.get(6)?;
            Ok(RawCitation {
              citation_id: row.get(0)?,
              title:       row.get(1)?,
              database_id: row.get(2)?,
              record_id:   row.get(3)?,
              source_id:   row.get(4)?,
              image_ref:   row.get(5)?,
              asset:       asset_key
                .is_some()
                .then(|| RawAsset::from_row(row, 6))
                .transpose()?,
            })
          })
          .optional()?)
      })
      .await?;
    raw.map(RawCitation::into_citation).transpose()
  }

  // ── Snapshots ─────────────────────────────────────────────────────────────

  pub async fn save_snapshot(
    &self,
    tree: &ReconciledTree,
    report: &FailureReport,
  ) -> Result<()> {
    let run_id = tree.run_id.hyphenated().to_string();
    let started_at = encode_dt(tree.started_at);
    let finished_at = encode_dt(tree.finished_at);
    let tree_json = encode_tree(tree)?;
    let report_json = encode_report(report)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO snapshots
             (run_id, started_at, finished_at, tree_json, report_json)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![run_id, started_at, finished_at, tree_json, report_json],
        )?;
        Ok(())
      })
      .await?;
    debug!(run_id = %tree.run_id, "snapshot saved");
    Ok(())
  }

  /// The most recently finished snapshot, if any.
  pub async fn latest_snapshot(&self) -> Result<Option<StoredSnapshot>> {
    let raw: Option<(String, String)> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT tree_json, report_json FROM snapshots
             ORDER BY finished_at DESC, rowid DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(tree, report)| {
        Ok(StoredSnapshot { tree: decode_tree(&tree)?, report: decode_report(&report)? })
      })
      .transpose()
  }
}

// ─── MediaLedger impl ────────────────────────────────────────────────────────

impl MediaLedger for SqliteStore {
  type Error = Error;

  async fn find_asset(&self, key: MediaKey) -> Result<Option<MediaAsset>> {
    self.get_asset(&key).await
  }

  async fn store_asset(&self, request: AssetRequest, bytes: Bytes) -> Result<MediaAsset> {
    if let Some(existing) = self.get_asset(&request.key).await? {
      return Ok(existing);
    }

    let asset = request.to_asset(&bytes);
    self.write_file(&asset.path, &bytes).await?;

    let key_str = asset.key.to_string();
    let remote_ref = asset.remote_ref.clone();
    let category = encode_category(asset.category);
    let path = asset.path.clone();
    let hash = asset.content_hash.clone();
    let byte_len = asset.byte_len as i64;
    let title = asset.title.clone();
    let recorded_at = encode_dt(asset.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT OR IGNORE INTO media_assets ({ASSET_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
          ),
          rusqlite::params![
            key_str, remote_ref, category, path, hash, byte_len, title, recorded_at
          ],
        )?;
        Ok(())
      })
      .await?;
    debug!(key = %asset.key, path = %asset.path, "asset recorded");

    // A concurrent writer may have won the insert; its row is canonical.
    Ok(self.get_asset(&asset.key).await?.unwrap_or(asset))
  }

  async fn record_citation(&self, citation: Citation) -> Result<()> {
    let asset_key = citation.local_asset.as_ref().map(|a| a.key.to_string());
    let record = citation.record;
    let updated_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO citations
             (citation_id, title, database_id, record_id, source_id, image_ref,
              asset_key, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(citation_id) DO UPDATE SET
             title       = excluded.title,
             database_id = excluded.database_id,
             record_id   = excluded.record_id,
             source_id   = excluded.source_id,
             image_ref   = excluded.image_ref,
             asset_key   = COALESCE(excluded.asset_key, citations.asset_key),
             updated_at  = excluded.updated_at",
          rusqlite::params![
            record.citation_id,
            record.title,
            record.database_id,
            record.record_id,
            record.source_id,
            record.image_ref,
            asset_key,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
