//! Inspection Client Module
//!
//! Performs single remote inspection calls and maps transport and API
//! failures onto [`InspectError`]. The client never touches the cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::InspectError;
use crate::inspection::InspectionResult;

// == Inspector Trait ==
/// One remote inspection of `url` against `property`.
#[async_trait]
pub trait Inspector: Send + Sync {
    async fn inspect(&self, property: &str, url: &str) -> Result<InspectionResult, InspectError>;
}

// == Token Provider ==
/// Supplies the bearer token for remote calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, InspectError>;
}

/// Token obtained out of band (e.g. `gcloud auth print-access-token`).
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, InspectError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(InspectError::Auth("no access token configured".to_string()));
        }
        Ok(token.to_string())
    }
}

// == Search Console Client ==
/// HTTP client for the URL Inspection API.
pub struct SearchConsoleClient {
    http: reqwest::Client,
    endpoint: String,
    language_code: String,
    tokens: Arc<dyn TokenProvider>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectRequestBody<'a> {
    inspection_url: &'a str,
    site_url: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl SearchConsoleClient {
    /// Builds a client using the endpoint, language and timeout from `config`.
    pub fn new(
        config: &Config,
        tokens: Arc<dyn TokenProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1/urlInspection/index:inspect",
                config.api_base_url.trim_end_matches('/')
            ),
            language_code: config.language_code.clone(),
            tokens,
            clock,
        })
    }
}

#[async_trait]
impl Inspector for SearchConsoleClient {
    async fn inspect(&self, property: &str, url: &str) -> Result<InspectionResult, InspectError> {
        let token = self.tokens.access_token().await?;
        let body = InspectRequestBody {
            inspection_url: url,
            site_url: property,
            language_code: &self.language_code,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        debug!("Inspection of {} returned {}", url, status);

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| InspectError::Transient(format!("undecodable response: {e}")))?;
            return InspectionResult::from_payload(property, url, payload, self.clock.now())
                .map_err(|e| InspectError::Transient(format!("unexpected response shape: {e}")));
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await.unwrap_or_default();
        let message = remote_message(&text).unwrap_or_else(|| status.to_string());

        Err(classify_status(status, message, retry_after))
    }
}

/// Maps a non-success HTTP status onto the error taxonomy.
pub fn classify_status(
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> InspectError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InspectError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => InspectError::RateLimited {
            message,
            retry_after,
        },
        StatusCode::REQUEST_TIMEOUT => InspectError::Transient(message),
        s if s.is_server_error() => InspectError::Transient(message),
        _ => InspectError::NotFound(message),
    }
}

fn map_transport_error(err: reqwest::Error) -> InspectError {
    if err.is_timeout() {
        InspectError::Transient("request timed out".to_string())
    } else {
        InspectError::Transient(err.to_string())
    }
}

fn remote_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
}
