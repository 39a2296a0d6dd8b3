//! JSON-over-HTTP fetching.
//!
//! This module owns transport details only: request building, timeout and
//! status mapping, and JSON decoding. Bodies are returned as opaque
//! [`serde_json::Value`]s.

use crate::models::{EndpointConfig, Role};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Extra headers sent with a single request, as `(name, value)` pairs.
pub type RequestHeaders = Vec<(String, String)>;

/// Query parameter carrying the user identifier.
const USER_ID_PARAM: &str = "user_id";

/// Longest error body kept in a [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Failure of a single outbound call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The call did not finish within the configured timeout.
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    /// Connection, TLS or protocol failure.
    #[error("cannot reach {url}: {message}")]
    Transport { url: String, message: String },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The body was not valid JSON.
    #[error("{url} did not return valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that can GET a URL and hand back its JSON body.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetch `url` and decode the body as JSON.
    async fn get_json(&self, url: &Url, headers: &RequestHeaders) -> Result<Value, FetchError>;
}

/// Reqwest-backed fetcher with a bounded per-request timeout.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with its own client.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self::from_client(client, timeout))
    }

    /// Wrap an existing client. `timeout` is only used for error reporting;
    /// the client is expected to enforce it.
    pub fn from_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_transport_error(&self, url: &Url, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs().max(1),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &Url, headers: &RequestHeaders) -> Result<Value, FetchError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url.clone());
        // A caller-supplied Accept replaces the default rather than adding a second one.
        if !headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(reqwest::header::ACCEPT.as_str()))
        {
            request = request.header(reqwest::header::ACCEPT, "application/json");
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(url, e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&String::from_utf8_lossy(&body)),
            });
        }

        debug!("{} answered {} ({} bytes)", url, status, body.len());

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// URL for a required role with the identifier attached as `user_id`.
///
/// Returns `None` when the role is not configured or is the leaderboard,
/// which takes no identifier.
pub fn build_role_url(config: &EndpointConfig, role: Role, identifier: &str) -> Option<Url> {
    role.path()?;
    let mut url = config.url_for(role)?;
    url.query_pairs_mut().append_pair(USER_ID_PARAM, identifier);
    Some(url)
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
    format!("{}...", cut)
}
