//! Heart-rate sample feed
//!
//! The analyzer treats samples as a plain data feed. `HeartRateSource` is the
//! seam; `OuraHeartRateSource` reads the Oura v2 heart-rate collection.

use std::future::Future;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::analysis::HrSample;
use crate::config::AppConfig;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("API error: {0}")]
  Api(String),

  #[error("Superseded by a newer refresh")]
  Superseded,

  #[error("Sample task failed: {0}")]
  Task(String),
}

impl Serialize for SampleError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Source Trait
/// ---------------------------------------------------------------------------

/// Supplies time-ordered heart-rate samples within `[start, end)`.
/// An empty result is a valid answer.
pub trait HeartRateSource: Send + Sync {
  fn fetch_heart_rate(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<HrSample>, SampleError>> + Send;
}

/// Keep samples inside `[start, end)` with a usable bpm, oldest first
pub fn normalize_samples(
  mut samples: Vec<HrSample>,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
) -> Vec<HrSample> {
  samples.retain(|s| s.timestamp >= start && s.timestamp < end && s.bpm.is_finite() && s.bpm > 0.0);
  samples.sort_by_key(|s| s.timestamp);
  samples
}

/// ---------------------------------------------------------------------------
/// Oura API Data Structures
/// ---------------------------------------------------------------------------

/// Heart-rate response from Oura API v2
#[derive(Debug, Deserialize)]
pub struct HeartRateResponse {
  pub data: Vec<HeartRateData>,
  pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HeartRateData {
  pub bpm: f64,
  /// "awake", "rest", "sleep", "session", "live", "workout"
  pub source: Option<String>,
  pub timestamp: DateTime<Utc>,
}

/// ---------------------------------------------------------------------------
/// Oura Source
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OuraHeartRateSource {
  client: Client,
  access_token: String,
  api_base: String,
}

impl OuraHeartRateSource {
  pub fn new(access_token: impl Into<String>, api_base: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      access_token: access_token.into(),
      api_base: api_base.into(),
    }
  }

  pub fn from_config(config: &AppConfig) -> Result<Self, SampleError> {
    let token = config
      .oura_access_token
      .clone()
      .ok_or_else(|| SampleError::MissingConfig("OURA_ACCESS_TOKEN".into()))?;
    Ok(Self::new(token, config.oura_api_base.clone()))
  }

  fn page_url(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    next_token: Option<&str>,
  ) -> Result<url::Url, SampleError> {
    let base = format!("{}/heartrate", self.api_base.trim_end_matches('/'));
    let mut url = url::Url::parse(&base)
      .map_err(|e| SampleError::MissingConfig(format!("OURA_API_BASE: {}", e)))?;

    {
      let mut query = url.query_pairs_mut();
      query
        .append_pair("start_datetime", &start.to_rfc3339_opts(SecondsFormat::Secs, true))
        .append_pair("end_datetime", &end.to_rfc3339_opts(SecondsFormat::Secs, true));
      if let Some(token) = next_token {
        query.append_pair("next_token", token);
      }
    }

    Ok(url)
  }

  async fn fetch_page(&self, url: url::Url) -> Result<HeartRateResponse, SampleError> {
    let response = self
      .client
      .get(url)
      .bearer_auth(&self.access_token)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(SampleError::Api(format!(
        "Heart rate API error {}: {}",
        status, error_text
      )));
    }

    Ok(response.json().await?)
  }
}

impl HeartRateSource for OuraHeartRateSource {
  async fn fetch_heart_rate(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HrSample>, SampleError> {
    let mut samples = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
      let url = self.page_url(start, end, next_token.as_deref())?;
      let page = self.fetch_page(url).await?;
      samples.extend(page.data.into_iter().map(|d| HrSample::new(d.timestamp, d.bpm)));

      match page.next_token {
        Some(token) if !token.is_empty() => next_token = Some(token),
        _ => break,
      }
    }

    tracing::debug!(count = samples.len(), %start, %end, "fetched heart rate samples");
    Ok(normalize_samples(samples, start, end))
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};
  use mockito::Matcher;

  fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap();
    (start, start + Duration::minutes(30))
  }

  #[test]
  fn test_normalize_filters_and_sorts() {
    let (start, end) = window();
    let samples = vec![
      HrSample::new(start + Duration::minutes(2), 130.0),
      HrSample::new(start - Duration::minutes(1), 90.0), // before window
      HrSample::new(start, 120.0),
      HrSample::new(end, 150.0), // end is exclusive
      HrSample::new(start + Duration::minutes(1), 0.0),
      HrSample::new(start + Duration::minutes(3), f64::NAN),
    ];

    let normalized = normalize_samples(samples, start, end);
    let bpms: Vec<f64> = normalized.iter().map(|s| s.bpm).collect();
    assert_eq!(bpms, vec![120.0, 130.0]);
  }

  #[test]
  fn test_from_config_requires_token() {
    let config = AppConfig {
      database_url: "sqlite::memory:".to_string(),
      user_id: "user-1".to_string(),
      oura_access_token: None,
      oura_api_base: "http://localhost".to_string(),
    };
    assert!(matches!(
      OuraHeartRateSource::from_config(&config),
      Err(SampleError::MissingConfig(_))
    ));
  }

  #[tokio::test]
  async fn test_fetch_heart_rate_follows_pages() {
    let mut server = mockito::Server::new_async().await;
    let (start, end) = window();

    let first = server
      .mock("GET", "/heartrate")
      .match_header("authorization", "Bearer test-token")
      .match_query(Matcher::Regex("^start_datetime=[^&]+&end_datetime=[^&]+$".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        serde_json::json!({
          "data": [
            { "bpm": 128, "source": "workout", "timestamp": "2025-03-01T07:01:00+00:00" },
            { "bpm": 120, "source": "workout", "timestamp": "2025-03-01T07:00:00+00:00" }
          ],
          "next_token": "page-2"
        })
        .to_string(),
      )
      .create_async()
      .await;

    let second = server
      .mock("GET", "/heartrate")
      .match_query(Matcher::Regex("next_token=page-2".into()))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        serde_json::json!({
          "data": [
            { "bpm": 141, "source": "workout", "timestamp": "2025-03-01T08:02:00+01:00" },
            { "bpm": 99, "source": "awake", "timestamp": "2025-03-01T09:00:00+00:00" }
          ],
          "next_token": null
        })
        .to_string(),
      )
      .create_async()
      .await;

    let source = OuraHeartRateSource::new("test-token", server.url());
    let samples = source.fetch_heart_rate(start, end).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;

    // 08:02+01:00 is 07:02Z; 09:00Z is outside the window
    let bpms: Vec<f64> = samples.iter().map(|s| s.bpm).collect();
    assert_eq!(bpms, vec![120.0, 128.0, 141.0]);
  }

  #[tokio::test]
  async fn test_fetch_heart_rate_empty_window() {
    let mut server = mockito::Server::new_async().await;
    let (start, end) = window();

    let mock = server
      .mock("GET", "/heartrate")
      .match_query(Matcher::Any)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"data": [], "next_token": null}"#)
      .create_async()
      .await;

    let source = OuraHeartRateSource::new("test-token", server.url());
    let samples = source.fetch_heart_rate(start, end).await.unwrap();

    mock.assert_async().await;
    assert!(samples.is_empty());
  }

  #[tokio::test]
  async fn test_fetch_heart_rate_api_error() {
    let mut server = mockito::Server::new_async().await;
    let (start, end) = window();

    let mock = server
      .mock("GET", "/heartrate")
      .match_query(Matcher::Any)
      .with_status(401)
      .with_body("unauthorized")
      .create_async()
      .await;

    let source = OuraHeartRateSource::new("expired", server.url());
    let err = source.fetch_heart_rate(start, end).await.unwrap_err();

    mock.assert_async().await;
    match err {
      SampleError::Api(msg) => assert!(msg.contains("401"), "unexpected message: {}", msg),
      other => panic!("expected Api error, got {:?}", other),
    }
  }
}
