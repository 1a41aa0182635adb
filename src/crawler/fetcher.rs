//! HTTP platform client
//!
//! This module handles all requests to the platform, including:
//! - Building HTTP clients with proper user agent strings
//! - Pacing consecutive requests
//! - Mapping HTTP status codes onto platform faults
//! - Decoding the platform's JSON payloads

use crate::config::{Config, PlatformConfig, UserAgentConfig};
use crate::crawler::seeder::{DefaultListing, ListingPage};
use crate::node::{NodeAbout, NodeId, SubmissionKind};
use crate::{ConfigError, MapperError, PlatformError, PlatformResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

/// Access to the platform's node and collection data
///
/// Implementations classify every failure into a `PlatformError` variant; the
/// engine relies on that classification to decide between skipping a node and
/// stopping the crawl.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetches a node's attributes and sidebar description
    async fn fetch_node(&self, id: &NodeId) -> PlatformResult<NodeAbout>;

    /// Fetches the raw member names of a curated collection
    async fn fetch_collection_members(&self, owner: &str, name: &str)
        -> PlatformResult<Vec<String>>;
}

/// Enforces a minimum interval between consecutive requests
#[derive(Debug, Clone)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request_time: Option<Instant>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_time: None,
        }
    }

    /// Returns how long to wait before the next request may be sent
    pub fn time_until_next_request(&self, now: Instant) -> Duration {
        match self.last_request_time {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                self.min_interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Records that a request was sent at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed: the platform answers a request for an unknown
/// node with a redirect to its search page.
///
/// # Example
///
/// ```no_run
/// use subreddit_mapper::config::{PlatformConfig, UserAgentConfig};
/// use subreddit_mapper::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "SubredditMapper".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &PlatformConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    platform: &PlatformConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(platform.timeout_secs);

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a response status onto a platform fault
///
/// # Status Mapping
///
/// | Status | Fault |
/// |--------|-------|
/// | 2xx | none |
/// | 403 | PermissionDenied |
/// | 404, 3xx | NotFound |
/// | anything else | Transient |
pub fn classify_status(resource: &str, status: StatusCode) -> Option<PlatformError> {
    if status.is_success() {
        return None;
    }

    let error = if status == StatusCode::FORBIDDEN {
        PlatformError::PermissionDenied {
            resource: resource.to_string(),
        }
    } else if status == StatusCode::NOT_FOUND || status.is_redirection() {
        PlatformError::NotFound {
            resource: resource.to_string(),
        }
    } else {
        PlatformError::transient(resource, format!("HTTP {}", status))
    };
    Some(error)
}

fn classify_send_error(resource: &str, error: reqwest::Error) -> PlatformError {
    if error.is_timeout() {
        PlatformError::transient(resource, "request timed out")
    } else if error.is_connect() {
        PlatformError::transient(resource, format!("connection failed: {}", error))
    } else {
        PlatformError::transient(resource, error)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct AboutData {
    subscribers: Option<u64>,
    over18: Option<bool>,
    submission_type: Option<SubmissionKind>,
    description: Option<String>,
}

impl From<AboutData> for NodeAbout {
    fn from(data: AboutData) -> Self {
        Self {
            subscribers: data.subscribers.unwrap_or(0),
            is_restricted: data.over18.unwrap_or(false),
            submission_kind: data.submission_type.unwrap_or(SubmissionKind::Any),
            description: data.description.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MultiData {
    #[serde(default)]
    subreddits: Vec<MultiMember>,
}

#[derive(Debug, Deserialize)]
struct MultiMember {
    name: String,
}

/// `PlatformClient` over the platform's public JSON endpoints
pub struct HttpPlatformClient {
    client: Client,
    base_url: Url,
    pacer: Mutex<RequestPacer>,
}

impl HttpPlatformClient {
    /// Builds a client from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, MapperError> {
        let client = build_http_client(&config.user_agent, &config.platform)?;
        let base_url = Url::parse(&config.platform.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

        Ok(Self::with_parts(
            client,
            base_url,
            Duration::from_millis(config.crawler.request_delay_ms),
        ))
    }

    /// Builds a client from an existing reqwest client
    pub fn with_parts(client: Client, mut base_url: Url, request_delay: Duration) -> Self {
        // Url::join replaces the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client,
            base_url,
            pacer: Mutex::new(RequestPacer::new(request_delay)),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, resource: &str) -> PlatformResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PlatformError::transient(resource, format!("invalid endpoint: {}", e)))
    }

    /// Waits until the pacer allows another request, then records it
    async fn pace(&self) {
        let mut pacer = self.pacer.lock().await;
        let wait = pacer.time_until_next_request(Instant::now());
        if !wait.is_zero() {
            trace!("Pacing: waiting {:?} before next request", wait);
            tokio::time::sleep(wait).await;
        }
        pacer.record_request(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> PlatformResult<T> {
        self.pace().await;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_send_error(resource, e))?;

        if let Some(error) = classify_status(resource, response.status()) {
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| {
            PlatformError::transient(resource, format!("invalid response body: {}", e))
        })
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn fetch_node(&self, id: &NodeId) -> PlatformResult<NodeAbout> {
        let resource = format!("r/{}", id);
        let url = self.endpoint(&format!("r/{}/about.json", id), &resource)?;
        let about: Envelope<AboutData> = self.get_json(url, &resource).await?;
        Ok(about.data.into())
    }

    async fn fetch_collection_members(
        &self,
        owner: &str,
        name: &str,
    ) -> PlatformResult<Vec<String>> {
        let resource = format!("user/{}/m/{}", owner, name);
        let url = self.endpoint(&format!("api/multi/user/{}/m/{}", owner, name), &resource)?;
        let multi: Envelope<MultiData> = self.get_json(url, &resource).await?;
        Ok(multi.data.subreddits.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl DefaultListing for HttpPlatformClient {
    async fn fetch_default_listing(&self) -> PlatformResult<Vec<String>> {
        let resource = "default listing";
        let url = self.endpoint("subreddits/default.json?limit=100", resource)?;
        let listing: ListingPage = self.get_json(url, resource).await?;
        Ok(listing.names())
    }
}
