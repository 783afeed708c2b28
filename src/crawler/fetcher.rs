//! Page fetching through the proxy endpoint
//!
//! This module contains:
//! - The `Fetcher` trait the crawler uses to load pages
//! - `ProxyFetcher`, which asks the proxy endpoint for a page's data
//! - The JSON payload the proxy answers with
//!
//! The proxy is queried as `GET {endpoint}?u=<canonical url>&agent=<profile>`
//! and responds with:
//!
//! ```json
//! {
//!   "url_fetched": "https://example.com/about",
//!   "headers": { "content-type": "text/html", "set-cookie": ["a=1", "b=2"] },
//!   "body": "<html>...</html>",
//!   "field_data": { "word_count": 120 },
//!   "phrases": ["about us"]
//! }
//! ```

use crate::config::{ProxyConfig, UserAgent};
use crate::{ConfigError, HarnessError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Response headers; a header may carry several values
pub type Headers = BTreeMap<String, Vec<String>>;

/// Extracted page metadata supplied by the proxy
pub type FieldData = BTreeMap<String, serde_json::Value>;

/// Errors raised while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("proxy returned HTTP {0}")]
    Status(u16),

    #[error("invalid proxy payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Page data returned by a fetch
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FetchedPage {
    /// URL the proxy actually served, before canonicalization
    ///
    /// Empty when the proxy did not report one.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url_fetched: String,

    /// `None` when the proxy sent no headers
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: Option<Headers>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub field_data: FieldData,

    #[serde(default, deserialize_with = "null_as_default")]
    pub phrases: Vec<String>,
}

impl FetchedPage {
    /// Returns the body if it is present and non-empty
    pub fn usable_body(&self) -> Option<&str> {
        self.body.as_deref().filter(|body| !body.is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValue {
    One(String),
    Many(Vec<String>),
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<Option<Headers>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, HeaderValue>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|headers| {
        headers
            .into_iter()
            .map(|(name, value)| match value {
                HeaderValue::One(value) => (name, vec![value]),
                HeaderValue::Many(values) => (name, values),
            })
            .collect()
    }))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Loads pages for the crawler
///
/// Implementations must not retry on their own; a returned error marks the
/// URL as failed.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str, user_agent: UserAgent) -> Result<FetchedPage, FetchError>;
}

/// Fetcher that loads pages through the proxy endpoint
#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: Client,
    endpoint: Url,
}

impl ProxyFetcher {
    /// Builds a proxy fetcher from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyFetcher)` - Ready to fetch
    /// * `Err(HarnessError)` - The endpoint is not a valid URL or the HTTP client failed to build
    pub fn new(config: &ProxyConfig) -> Result<Self, HarnessError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ConfigError::Validation(format!(
                "proxy endpoint '{}' is not a valid URL: {}",
                config.endpoint, e
            ))
        })?;

        let client = build_http_client().map_err(FetchError::from)?;
        Ok(Self { client, endpoint })
    }

    /// Builds the proxy request URL for a page
    pub fn request_url(&self, url: &str, user_agent: UserAgent) -> Url {
        let mut request = self.endpoint.clone();
        request
            .query_pairs_mut()
            .append_pair("u", url)
            .append_pair("agent", user_agent.as_str());
        request
    }
}

/// Builds the HTTP client used to talk to the proxy
///
/// The overall request deadline is enforced by the scheduler, so only the
/// connect phase is bounded here.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format!("crawl-harness/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl Fetcher for ProxyFetcher {
    async fn fetch(&self, url: &str, user_agent: UserAgent) -> Result<FetchedPage, FetchError> {
        let request = self.request_url(url, user_agent);
        tracing::debug!("Fetching {} via {}", url, request);

        let response = self.client.get(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
