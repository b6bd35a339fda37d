//! HTTP implementation of [`Upstream`] against the family-tree web API.
//!
//! The session is already authenticated: the caller supplies the cookie
//! header verbatim and it is attached to every request. Each method is exactly
//! one request; the engine owns retries and pacing.

use std::time::Duration;

use bytes::Bytes;
use lineage_core::{
  payload::{FamilyView, RemoteMedia, RemotePerson},
  person::PersonId,
  upstream::Upstream,
};
use reqwest::{
  Client, RequestBuilder, Response, StatusCode, Url,
  header::{self, HeaderMap, HeaderValue},
};
use serde::Deserialize;

/// Query parameters stripped from record-image references so the full-size
/// image is fetched.
const SIZE_PARAMS: [&str; 3] = ["maxWidth", "maxHeight", "maxSide"];

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
  #[error("{what} failed: {source}")]
  Request {
    what:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{what} → {status}")]
  Status { what: String, status: StatusCode },

  #[error("invalid media reference {reference:?}: {reason}")]
  Reference { reference: String, reason: String },
}

/// Connection settings for the upstream.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  pub base_url:       String,
  pub tree_id:        String,
  pub session_cookie: String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpUpstream {
  client:  Client,
  base:    String,
  tree_id: String,
}

impl HttpUpstream {
  pub fn new(config: HttpConfig) -> anyhow::Result<Self> {
    use anyhow::Context as _;

    let mut headers = HeaderMap::new();
    if !config.session_cookie.is_empty() {
      let mut cookie = HeaderValue::from_str(&config.session_cookie)
        .context("session cookie is not a valid header value")?;
      cookie.set_sensitive(true);
      headers.insert(header::COOKIE, cookie);
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .default_headers(headers)
      .build()
      .context("failed to build HTTP client")?;

    Ok(Self {
      client,
      base: config.base_url.trim_end_matches('/').to_owned(),
      tree_id: config.tree_id,
    })
  }

  fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }

  fn referer(&self) -> String { format!("{}/", self.base) }

  /// `https://…` references are used as-is; anything else is resolved
  /// against the base URL.
  fn absolute(&self, reference: &str) -> String {
    if reference.starts_with("http") {
      reference.to_owned()
    } else if reference.starts_with('/') {
      self.url(reference)
    } else {
      format!("{}/{}", self.base, reference)
    }
  }

  /// The view is addressed by the short ID; the focal record inside it
  /// still carries the full one.
  fn relationships_request(&self, person_id: &PersonId) -> RequestBuilder {
    let path = format!("/api/treeviewer/tree/newfamilyview/{}", self.tree_id);
    self
      .client
      .get(self.url(&path))
      .query(&[
        ("focusPersonId", person_id.short()),
        ("isFocus", "true"),
        ("view", "family"),
        ("genup", "1"),
        ("gendown", "1"),
      ])
      .header(header::ACCEPT, "*/*")
      .header(header::REFERER, self.referer())
  }

  async fn send(
    &self,
    what: impl Into<String>,
    req: RequestBuilder,
  ) -> Result<Response, HttpError> {
    let what = what.into();
    let resp = match req.send().await {
      Ok(resp) => resp,
      Err(source) => return Err(HttpError::Request { what, source }),
    };
    if !resp.status().is_success() {
      return Err(HttpError::Status { what, status: resp.status() });
    }
    Ok(resp)
  }

  async fn json<T: serde::de::DeserializeOwned>(
    &self,
    what: &str,
    req: RequestBuilder,
  ) -> Result<T, HttpError> {
    let resp = self.send(what, req).await?;
    resp.json().await.map_err(|source| HttpError::Request {
      what: format!("decoding {what}"),
      source,
    })
  }
}

/// `reference` with the size-limiting query parameters removed.
fn full_size(reference: &str) -> Result<String, HttpError> {
  let mut url = Url::parse(reference).map_err(|e| HttpError::Reference {
    reference: reference.to_owned(),
    reason:    e.to_string(),
  })?;

  let kept: Vec<(String, String)> = url
    .query_pairs()
    .filter(|(k, _)| !SIZE_PARAMS.contains(&k.as_ref()))
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  url.set_query(None);
  if !kept.is_empty() {
    url.query_pairs_mut().extend_pairs(kept);
  }
  Ok(url.into())
}

// ─── Media viewer payload ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct MediaListing {
  #[serde(default)]
  objects: Vec<MediaObject>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaObject {
  #[serde(default)]
  url:         String,
  #[serde(default)]
  title:       String,
  #[serde(default)]
  category:    String,
  #[serde(default)]
  subcategory: String,
  #[serde(default)]
  description: String,
}

// ─── Upstream ────────────────────────────────────────────────────────────────

impl Upstream for HttpUpstream {
  type Error = HttpError;

  /// `GET /api/treesui-list/trees/<tree>/persons/count`
  async fn fetch_catalog_count(&self) -> Result<u32, HttpError> {
    let path = format!("/api/treesui-list/trees/{}/persons/count", self.tree_id);
    let req = self
      .client
      .get(self.url(&path))
      .header(header::ACCEPT, "*/*")
      .header(header::REFERER, self.referer());
    self.json("GET persons/count", req).await
  }

  /// `GET /api/treesui-list/trees/<tree>/persons?page=<n>&limit=<size>`
  async fn fetch_catalog_page(
    &self,
    page: u32,
    page_size: u32,
  ) -> Result<Vec<RemotePerson>, HttpError> {
    let path = format!("/api/treesui-list/trees/{}/persons", self.tree_id);
    let req = self
      .client
      .get(self.url(&path))
      .query(&[
        ("sort", "sname,gname,id".to_owned()),
        ("fields", "NAMES,EVENTS".to_owned()),
        ("page", page.to_string()),
        ("limit", page_size.to_string()),
      ])
      .header(header::ACCEPT, "*/*")
      .header(header::REFERER, self.referer());
    self.json(&format!("GET persons page {page}"), req).await
  }

  /// `GET /api/treeviewer/tree/newfamilyview/<tree>?focusPersonId=<id>`
  async fn fetch_relationships(
    &self,
    person_id: PersonId,
  ) -> Result<FamilyView, HttpError> {
    let req = self.relationships_request(&person_id);
    self.json(&format!("GET newfamilyview {person_id}"), req).await
  }

  /// `GET /family-tree/person/tree/<tree>/person/<short id>/facts`
  async fn fetch_detail_blob(
    &self,
    person_id: PersonId,
    timeout: Duration,
  ) -> Result<String, HttpError> {
    let path = format!(
      "/family-tree/person/tree/{}/person/{}/facts",
      self.tree_id,
      person_id.short()
    );
    let what = format!("GET facts {person_id}");
    let req = self
      .client
      .get(self.url(&path))
      .timeout(timeout)
      .header(
        header::ACCEPT,
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
      )
      .header(header::REFERER, self.referer());

    let resp = self.send(what.clone(), req).await?;
    resp
      .text()
      .await
      .map_err(|source| HttpError::Request { what, source })
  }

  async fn fetch_citation_asset(
    &self,
    remote_ref: String,
  ) -> Result<Bytes, HttpError> {
    let url = full_size(&self.absolute(&remote_ref))?;
    let req = self
      .client
      .get(url)
      .header(header::ACCEPT, "image/webp,image/apng,image/*,*/*;q=0.8")
      .header(header::REFERER, self.referer());

    let what = format!("GET {remote_ref}");
    let resp = self.send(what.clone(), req).await?;
    resp
      .bytes()
      .await
      .map_err(|source| HttpError::Request { what, source })
  }

  /// `GET /api/media/viewer/v1/trees/<tree>/people/<short id>`
  async fn fetch_person_media(
    &self,
    person_id: PersonId,
  ) -> Result<Vec<RemoteMedia>, HttpError> {
    let path = format!(
      "/api/media/viewer/v1/trees/{}/people/{}",
      self.tree_id,
      person_id.short()
    );
    let req = self
      .client
      .get(self.url(&path))
      .query(&[
        ("excludeInlineStories", "1"),
        ("collectionId", "1030"),
        ("page", "1"),
        ("rows", "100"),
        ("sort", "-created"),
      ])
      .header(header::ACCEPT, "application/json");

    let listing: MediaListing =
      self.json(&format!("GET media {person_id}"), req).await?;

    Ok(
      listing
        .objects
        .into_iter()
        .map(|o| RemoteMedia {
          url:         if o.url.is_empty() { o.url } else { self.absolute(&o.url) },
          title:       o.title,
          category:    o.category,
          subcategory: o.subcategory,
          description: o.description,
        })
        .collect(),
    )
  }
}
