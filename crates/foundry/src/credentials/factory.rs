use std::sync::Arc;

use super::azure_cli::AzureCliCredential;
use super::cache::{CachedCredential, TokenCache};
use super::chain::DefaultCredential;
use super::client_secret::ClientSecretCredential;
use super::environment::{Environment, RealEnvironment};
use super::managed_identity::ManagedIdentityCredential;
use super::static_token::StaticTokenCredential;
use super::TokenCredential;
use crate::configuration::{CredentialKind, CredentialSettings};
use crate::errors::{FoundryError, FoundryResult};

pub fn get_credential(settings: &CredentialSettings) -> FoundryResult<Arc<dyn TokenCredential>> {
    get_credential_with_env(settings, &RealEnvironment)
}

/// Build the configured source, wrapped in a token cache
pub fn get_credential_with_env(
    settings: &CredentialSettings,
    env: &dyn Environment,
) -> FoundryResult<Arc<dyn TokenCredential>> {
    let source: Arc<dyn TokenCredential> = match settings.kind {
        CredentialKind::Default => Arc::new(DefaultCredential::from_env(env)),
        CredentialKind::Environment => {
            let credential = ClientSecretCredential::from_env(env).map_err(|err| match err {
                FoundryError::CredentialUnavailable(reason) => FoundryError::Config(reason),
                other => other,
            })?;
            Arc::new(credential)
        }
        CredentialKind::ManagedIdentity => Arc::new(ManagedIdentityCredential::from_env(env)),
        CredentialKind::AzureCli => {
            let credential = AzureCliCredential::new();
            match env.get_var("AZURE_TENANT_ID") {
                Some(tenant) => Arc::new(credential.with_tenant(tenant)),
                None => Arc::new(credential),
            }
        }
        CredentialKind::Token => {
            let token = settings.token.clone().ok_or_else(|| {
                FoundryError::Config("credential kind `token` requires a token".into())
            })?;
            // Nothing to refresh or persist
            return Ok(Arc::new(StaticTokenCredential::new(token)));
        }
    };

    let cached = CachedCredential::new(source);
    Ok(Arc::new(match &settings.cache_dir {
        Some(dir) => cached.with_store(TokenCache::new(dir)),
        None => cached,
    }))
}
