use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::configuration::Settings;
use crate::credentials::{TokenCredential, DEFAULT_SCOPE};
use crate::errors::{FoundryError, FoundryResult};
use crate::retry::RetryConfig;

pub const DEFAULT_API_VERSION: &str = "2025-11-15-preview";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub api_version: String,
    /// Bound on every outbound call, connection through body
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub scopes: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
        }
    }
}

/// A session with one Foundry project.
///
/// Construction does no I/O: the credential and the endpoint are first exercised
/// by the first real call. Clones share the connection pool and the credential,
/// so one client can serve concurrent calls.
#[derive(Clone)]
pub struct ProjectClient {
    http: Client,
    endpoint: Url,
    credential: Arc<dyn TokenCredential>,
    options: ClientOptions,
}

impl fmt::Debug for ProjectClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("credential", &self.credential.cache_key())
            .field("options", &self.options)
            .finish()
    }
}

impl ProjectClient {
    pub fn connect(endpoint: &str, credential: Arc<dyn TokenCredential>) -> FoundryResult<Self> {
        Self::connect_with_options(endpoint, credential, ClientOptions::default())
    }

    pub fn connect_with_options(
        endpoint: &str,
        credential: Arc<dyn TokenCredential>,
        options: ClientOptions,
    ) -> FoundryResult<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| FoundryError::Config(format!("could not build HTTP client: {}", e)))?;

        debug!("project client for {}", endpoint);
        Ok(Self {
            http,
            endpoint,
            credential,
            options,
        })
    }

    pub fn from_settings(
        settings: &Settings,
        credential: Arc<dyn TokenCredential>,
    ) -> FoundryResult<Self> {
        Self::connect_with_options(
            settings.project.endpoint(),
            credential,
            settings.client_options(),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// `{endpoint}/{segments...}?api-version=...&{query...}`, segments percent-encoded
    pub(crate) fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> FoundryResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FoundryError::Config(format!("endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", &self.options.api_version);
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn authorization(&self) -> FoundryResult<String> {
        let token = self.credential.get_token(&self.options.scopes).await?;
        if token.is_expired() {
            return Err(FoundryError::Authentication(format!(
                "credential returned a token that expired at {}",
                token.expires_at
            )));
        }
        Ok(format!("Bearer {}", token.token))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> FoundryResult<T> {
        self.send::<(), T>(Method::GET, url, None).await
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> FoundryResult<T> {
        self.send(Method::POST, url, Some(body)).await
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> FoundryResult<T> {
        let auth_header = self.authorization().await?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(AUTHORIZATION, auth_header);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!("{} {} -> {}", method, url.path(), response.status());
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> FoundryResult<T> {
    let status = response.status();
    if status.is_success() {
        let text = response.text().await?;
        return Ok(serde_json::from_str(&text)?);
    }

    let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
        parse_retry_after(response.headers())
    } else {
        None
    };
    let body = response.text().await.unwrap_or_default();
    Err(FoundryError::from_status(status, &body, retry_after))
}

/// `Retry-After` in seconds, or the millisecond variant Azure sometimes sends
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(ms) = headers
        .get("retry-after-ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_millis(ms));
    }
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn parse_endpoint(endpoint: &str) -> FoundryResult<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(FoundryError::Config("endpoint is empty".into()));
    }
    let url = Url::parse(endpoint)
        .map_err(|e| FoundryError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))?;
    match url.scheme() {
        "https" | "http" if !url.cannot_be_a_base() => Ok(url),
        scheme => Err(FoundryError::Config(format!(
            "endpoint must be an http(s) URL, got scheme '{}'",
            scheme
        ))),
    }
}
