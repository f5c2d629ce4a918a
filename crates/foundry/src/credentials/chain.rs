use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::azure_cli::AzureCliCredential;
use super::client_secret::ClientSecretCredential;
use super::environment::Environment;
use super::managed_identity::ManagedIdentityCredential;
use super::{AccessToken, TokenCredential};
use crate::errors::{FoundryError, FoundryResult};

/// Tries each source in order until one produces a token.
///
/// Sources reporting `CredentialUnavailable` are skipped. Any other failure
/// means the source is configured but rejected, and ends the search.
pub struct DefaultCredential {
    sources: Vec<(&'static str, Arc<dyn TokenCredential>)>,
}

impl DefaultCredential {
    pub fn new(sources: Vec<(&'static str, Arc<dyn TokenCredential>)>) -> Self {
        Self { sources }
    }

    /// environment → managed identity → Azure CLI
    pub fn from_env(env: &dyn Environment) -> Self {
        let environment: Arc<dyn TokenCredential> = match ClientSecretCredential::from_env(env) {
            Ok(credential) => Arc::new(credential),
            Err(FoundryError::CredentialUnavailable(reason)) => Arc::new(Unavailable(reason)),
            Err(err) => Arc::new(Unavailable(err.to_string())),
        };

        let managed_identity: Arc<dyn TokenCredential> =
            Arc::new(ManagedIdentityCredential::from_env(env));
        let azure_cli: Arc<dyn TokenCredential> = Arc::new(AzureCliCredential::new());

        Self::new(vec![
            ("environment", environment),
            ("managed identity", managed_identity),
            ("azure cli", azure_cli),
        ])
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scopes: &[String]) -> FoundryResult<AccessToken> {
        let mut reasons = Vec::new();

        for (name, source) in &self.sources {
            match source.get_token(scopes).await {
                Ok(token) => {
                    info!("authenticated with {} credential", name);
                    return Ok(token);
                }
                Err(FoundryError::CredentialUnavailable(reason)) => {
                    debug!("{} credential unavailable: {}", name, reason);
                    reasons.push(format!("{}: {}", name, reason));
                }
                Err(err) => return Err(err),
            }
        }

        Err(FoundryError::Authentication(format!(
            "no credential source available ({})",
            reasons.join("; ")
        )))
    }

    fn cache_key(&self) -> String {
        let keys: Vec<String> = self.sources.iter().map(|(_, s)| s.cache_key()).collect();
        format!("default[{}]", keys.join(","))
    }
}

/// Placeholder for a source whose configuration is absent
struct Unavailable(String);

#[async_trait]
impl TokenCredential for Unavailable {
    async fn get_token(&self, _scopes: &[String]) -> FoundryResult<AccessToken> {
        Err(FoundryError::CredentialUnavailable(self.0.clone()))
    }

    fn cache_key(&self) -> String {
        "unavailable".to_string()
    }
}
