//! Capabilities the engine consumes.
//!
//! [`Upstream`] is the already-authenticated remote source; every method is a
//! single request/response with no retry or throttling of its own. Retries,
//! backoff and rate limiting belong to the engine.
//!
//! [`MediaLedger`] records which assets have been downloaded so that a re-run
//! never downloads the same key twice.

use std::{future::Future, time::Duration};

use bytes::Bytes;

use crate::{
  citation::{AssetRequest, Citation, MediaAsset, MediaKey},
  payload::{FamilyView, RemoteMedia, RemotePerson},
  person::PersonId,
};

// ─── Upstream ────────────────────────────────────────────────────────────────

/// The remote family-tree source.
///
/// All methods return `Send` futures so implementations can be driven from a
/// multi-threaded runtime.
pub trait Upstream: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Total number of people in the catalog.
  fn fetch_catalog_count(
    &self,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// One page of the catalog. Pages are 1-based.
  fn fetch_catalog_page(
    &self,
    page: u32,
    page_size: u32,
  ) -> impl Future<Output = Result<Vec<RemotePerson>, Self::Error>> + Send + '_;

  /// Immediate family (one generation up and down) of `person_id`.
  fn fetch_relationships(
    &self,
    person_id: PersonId,
  ) -> impl Future<Output = Result<FamilyView, Self::Error>> + Send + '_;

  /// The HTML (or JSON-wrapped HTML) page that embeds the detail blob.
  /// `timeout` is the caller's deadline for this attempt.
  fn fetch_detail_blob(
    &self,
    person_id: PersonId,
    timeout: Duration,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Raw bytes behind a remote media reference.
  fn fetch_citation_asset(
    &self,
    remote_ref: String,
  ) -> impl Future<Output = Result<Bytes, Self::Error>> + Send + '_;

  /// Media attached directly to a person. Sources without a media listing
  /// keep the default, which lists nothing.
  fn fetch_person_media(
    &self,
    person_id: PersonId,
  ) -> impl Future<Output = Result<Vec<RemoteMedia>, Self::Error>> + Send + '_ {
    let _ = person_id;
    async { Ok::<Vec<RemoteMedia>, Self::Error>(Vec::new()) }
  }
}

// ─── MediaLedger ─────────────────────────────────────────────────────────────

/// Durable record of materialised citations and downloaded assets.
pub trait MediaLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The asset previously stored under `key`, if any.
  fn find_asset(
    &self,
    key: MediaKey,
  ) -> impl Future<Output = Result<Option<MediaAsset>, Self::Error>> + Send + '_;

  /// Persist downloaded bytes and record the asset. Storing a key that is
  /// already recorded returns the existing asset unchanged.
  fn store_asset(
    &self,
    request: AssetRequest,
    bytes: Bytes,
  ) -> impl Future<Output = Result<MediaAsset, Self::Error>> + Send + '_;

  /// Write (or refresh) the metadata of a materialised citation.
  fn record_citation(
    &self,
    citation: Citation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
