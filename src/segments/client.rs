use crate::config::Config;
use crate::error::FetchError;
use crate::segments::types::{ApiErrorBody, ApiMessage, CacheStats, Effort};
use crate::segments::EffortsApi;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

/// HTTP client for the segment analyzer backend
#[derive(Clone)]
pub struct SegmentClient {
  http: reqwest::Client,
  base_url: Url,
}

impl SegmentClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = parse_base_url(&config.server.url)?;

    let mut headers = HeaderMap::new();
    if let Some(session) = Config::get_session_token() {
      let cookie = HeaderValue::from_str(&format!("session={}", session))
        .map_err(|e| eyre!("Invalid session token: {}", e))?;
      headers.insert(COOKIE, cookie);
    }

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .user_agent(concat!("segview/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// URL of the efforts listing, with the fallback flag when requested
  pub fn efforts_url(&self, segment_id: u64, fallback: bool) -> Result<Url> {
    let mut url = self
      .base_url
      .join(&format!("segment/{}/efforts", segment_id))
      .map_err(|e| eyre!("Invalid efforts URL: {}", e))?;

    if fallback {
      url.query_pairs_mut().append_pair("fallback", "true");
    }

    Ok(url)
  }

  /// Get all efforts for a segment
  pub async fn get_segment_efforts(
    &self,
    segment_id: u64,
    fallback: bool,
  ) -> Result<Vec<Effort>, FetchError> {
    let url = self
      .efforts_url(segment_id, fallback)
      .map_err(|e| FetchError::remote(None, Some(e.to_string())))?;

    debug!(%url, "fetching segment efforts");

    let response = self.http.get(url).send().await.map_err(|e| {
      warn!(segment_id, error = %e, "efforts request failed");
      FetchError::remote(None, None)
    })?;

    let status = response.status();
    if status.is_success() {
      return response.json::<Vec<Effort>>().await.map_err(|e| {
        warn!(segment_id, error = %e, "could not decode efforts");
        FetchError::remote(Some(status.as_u16()), None)
      });
    }

    // Error bodies are best-effort; a missing or odd body still classifies by status
    let body: ApiErrorBody = response.json().await.unwrap_or_default();
    warn!(segment_id, status = status.as_u16(), error = ?body.error, "efforts request rejected");

    Err(FetchError::from_response(
      status.as_u16(),
      body.error,
      body.needs_reauth,
    ))
  }

  /// Get server-side cache statistics
  pub async fn get_cache_stats(&self) -> Result<CacheStats> {
    let url = self
      .base_url
      .join("cache/stats")
      .map_err(|e| eyre!("Invalid cache stats URL: {}", e))?;

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to get cache stats: {}", e))?;

    if !response.status().is_success() {
      return Err(eyre!("Failed to get cache stats: HTTP {}", response.status()));
    }

    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse cache stats: {}", e))
  }

  /// Ask the server to drop its expired cache entries
  pub async fn clear_cache(&self) -> Result<String> {
    let url = self
      .base_url
      .join("cache/clear")
      .map_err(|e| eyre!("Invalid cache clear URL: {}", e))?;

    let response = self
      .http
      .post(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    if !response.status().is_success() {
      return Err(eyre!("Failed to clear cache: HTTP {}", response.status()));
    }

    let body: ApiMessage = response.json().await.unwrap_or_default();
    Ok(
      body
        .message
        .unwrap_or_else(|| "Expired cache entries cleared".to_string()),
    )
  }
}

impl EffortsApi for SegmentClient {
  fn segment_efforts(
    &self,
    segment_id: u64,
    fallback: bool,
  ) -> impl Future<Output = Result<Vec<Effort>, FetchError>> + Send {
    let client = self.clone();
    async move { client.get_segment_efforts(segment_id, fallback).await }
  }
}

/// Parse the configured server URL so relative joins keep its path
fn parse_base_url(raw: &str) -> Result<Url> {
  let mut normalized = raw.trim().to_string();
  if !normalized.ends_with('/') {
    normalized.push('/');
  }
  Url::parse(&normalized).map_err(|e| eyre!("Invalid server URL '{}': {}", raw, e))
}
