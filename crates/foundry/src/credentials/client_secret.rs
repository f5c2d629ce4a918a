use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration as StdDuration;
use tracing::debug;

use super::environment::Environment;
use super::{AccessToken, TokenCredential};
use crate::errors::{FoundryError, FoundryResult};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const TOKEN_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// OAuth2 client-credentials grant against Microsoft Entra ID
pub struct ClientSecretCredential {
    client: Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new<S: Into<String>>(tenant_id: S, client_id: S, client_secret: S) -> Self {
        Self {
            client: token_client(TOKEN_REQUEST_TIMEOUT),
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn with_authority<S: Into<String>>(mut self, authority: S) -> Self {
        self.authority = authority.into();
        self
    }

    /// Bound on the token request, connection through body
    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.client = token_client(timeout);
        self
    }

    /// Build from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`,
    /// honoring `AZURE_AUTHORITY_HOST` when set.
    pub fn from_env(env: &dyn Environment) -> FoundryResult<Self> {
        let missing: Vec<&str> = ["AZURE_TENANT_ID", "AZURE_CLIENT_ID", "AZURE_CLIENT_SECRET"]
            .into_iter()
            .filter(|key| env.get_var(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(FoundryError::CredentialUnavailable(format!(
                "environment credential not configured, missing {}",
                missing.join(", ")
            )));
        }

        let get = |key: &str| env.get_var(key).unwrap_or_default();
        let credential = Self::new(
            get("AZURE_TENANT_ID"),
            get("AZURE_CLIENT_ID"),
            get("AZURE_CLIENT_SECRET"),
        );

        Ok(match env.get_var("AZURE_AUTHORITY_HOST") {
            Some(authority) => credential.with_authority(authority),
            None => credential,
        })
    }

    fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

fn token_client(timeout: StdDuration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scopes: &[String]) -> FoundryResult<AccessToken> {
        let scope = scopes.join(" ");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        debug!("requesting client credentials token for {}", self.client_id);
        let resp = self
            .client
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let description = body
                .get("error_description")
                .or_else(|| body.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("token request rejected");
            return Err(if status.is_server_error() {
                FoundryError::Service {
                    status: Some(status.as_u16()),
                    message: description.to_string(),
                }
            } else {
                FoundryError::Authentication(description.to_string())
            });
        }

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                FoundryError::Authentication("access_token not found in token response".into())
            })?
            .to_string();

        let expires_in = body
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);

        Ok(AccessToken::new(
            access_token,
            Utc::now() + Duration::seconds(expires_in),
        ))
    }

    fn cache_key(&self) -> String {
        format!("client_secret:{}:{}", self.tenant_id, self.client_id)
    }
}
