//! In-memory [`MediaLedger`].
//!
//! Keeps assets and citations for the lifetime of the value. Useful for
//! one-off runs and tests; the SQLite store is the durable counterpart.

use std::{
  collections::{BTreeMap, HashMap},
  convert::Infallible,
  sync::atomic::{AtomicUsize, Ordering},
};

use bytes::Bytes;
use lineage_core::{
  citation::{AssetRequest, Citation, MediaAsset, MediaKey},
  upstream::MediaLedger,
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryLedger {
  assets:    Mutex<HashMap<MediaKey, (MediaAsset, Bytes)>>,
  citations: Mutex<BTreeMap<String, Citation>>,
  stores:    AtomicUsize,
}

impl MemoryLedger {
  pub fn new() -> Self { Self::default() }

  /// Number of assets actually written, excluding idempotent repeats.
  pub fn stored_count(&self) -> usize { self.stores.load(Ordering::SeqCst) }

  pub async fn bytes_of(&self, key: &MediaKey) -> Option<Bytes> {
    self.assets.lock().await.get(key).map(|(_, b)| b.clone())
  }

  pub async fn citations(&self) -> BTreeMap<String, Citation> {
    self.citations.lock().await.clone()
  }
}

impl MediaLedger for MemoryLedger {
  type Error = Infallible;

  async fn find_asset(&self, key: MediaKey) -> Result<Option<MediaAsset>, Infallible> {
    Ok(self.assets.lock().await.get(&key).map(|(a, _)| a.clone()))
  }

  async fn store_asset(
    &self,
    request: AssetRequest,
    bytes: Bytes,
  ) -> Result<MediaAsset, Infallible> {
    let mut assets = self.assets.lock().await;
    if let Some((existing, _)) = assets.get(&request.key) {
      return Ok(existing.clone());
    }
    let asset = request.to_asset(&bytes);
    assets.insert(request.key, (asset.clone(), bytes));
    self.stores.fetch_add(1, Ordering::SeqCst);
    Ok(asset)
  }

  async fn record_citation(&self, citation: Citation) -> Result<(), Infallible> {
    self
      .citations
      .lock()
      .await
      .insert(citation.citation_id().to_owned(), citation);
    Ok(())
  }
}
