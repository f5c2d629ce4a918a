use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::environment::Environment;
use super::{parse_epoch, scope_to_resource, AccessToken, TokenCredential};
use crate::errors::{FoundryError, FoundryResult};

pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// The metadata endpoint is link-local; if it does not answer quickly it is not there.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
enum Source {
    /// Azure VMs, AKS and container instances
    Imds { endpoint: String },
    /// App Service and Functions
    AppService { endpoint: String, header: String },
}

/// Tokens for the managed identity of the host the process runs on
pub struct ManagedIdentityCredential {
    client: Client,
    source: Source,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    /// The instance metadata service, optionally for a user-assigned identity
    pub fn imds(client_id: Option<String>) -> Self {
        Self::with_source(
            Source::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
            client_id,
        )
    }

    pub fn with_imds_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.source = Source::Imds {
            endpoint: endpoint.into(),
        };
        self
    }

    /// Prefer the App Service identity endpoint when the host advertises one
    pub fn from_env(env: &dyn Environment) -> Self {
        let client_id = env.get_var("AZURE_CLIENT_ID");
        match (env.get_var("IDENTITY_ENDPOINT"), env.get_var("IDENTITY_HEADER")) {
            (Some(endpoint), Some(header)) => {
                Self::with_source(Source::AppService { endpoint, header }, client_id)
            }
            _ => Self::imds(client_id),
        }
    }

    fn with_source(source: Source, client_id: Option<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            source,
            client_id,
        }
    }

    fn request(&self, resource: &str) -> reqwest::RequestBuilder {
        let mut query = vec![("resource", resource.to_string())];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.clone()));
        }

        match &self.source {
            Source::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION.to_string()));
                self.client
                    .get(endpoint)
                    .header("Metadata", "true")
                    .query(&query)
            }
            Source::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION.to_string()));
                self.client
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query)
            }
        }
    }

    async fn fetch(&self, resource: &str) -> FoundryResult<AccessToken> {
        let resp = match self.request(resource).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => resp,
            Err(err) if err.is_connect() || err.is_timeout() => {
                return Err(FoundryError::CredentialUnavailable(format!(
                    "managed identity endpoint unreachable: {}",
                    err
                )));
            }
            Err(err) => return Err(err.into()),
        };

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .get("error_description")
                .or_else(|| body.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or("managed identity token request failed")
                .to_string();
            // IMDS answers 400 when no identity is assigned to the host
            return Err(match status.as_u16() {
                400 | 404 => FoundryError::CredentialUnavailable(message),
                code if code >= 500 => FoundryError::Service {
                    status: Some(code),
                    message,
                },
                _ => FoundryError::Authentication(message),
            });
        }

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                FoundryError::Authentication("access_token not found in token response".into())
            })?;
        let expires_at = body
            .get("expires_on")
            .and_then(parse_epoch)
            .ok_or_else(|| {
                FoundryError::Authentication("expires_on missing from token response".into())
            })?;

        Ok(AccessToken::new(access_token, expires_at))
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scopes: &[String]) -> FoundryResult<AccessToken> {
        let resource = scope_to_resource(scopes)?;
        debug!("requesting managed identity token via {:?}", self.source);

        match (self.fetch(&resource).await, &self.source) {
            // Anything answering on the link-local address without a usable token,
            // such as a proxy or gateway, means there is no metadata service here.
            (Err(err), Source::Imds { .. })
                if !matches!(err, FoundryError::CredentialUnavailable(_)) =>
            {
                Err(FoundryError::CredentialUnavailable(format!(
                    "no usable metadata service: {}",
                    err
                )))
            }
            (result, _) => result,
        }
    }

    fn cache_key(&self) -> String {
        format!(
            "managed_identity:{}",
            self.client_id.as_deref().unwrap_or("system")
        )
    }
}
