use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AccessToken, TokenCredential};
use crate::errors::{FoundryError, FoundryResult};

/// A fixed bearer token, for pipelines that mint tokens out of band and for tests
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    /// A token with no known expiry
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: AccessToken::new(token, DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn with_expiry<S: Into<String>>(token: S, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: AccessToken::new(token, expires_at),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[String]) -> FoundryResult<AccessToken> {
        if self.token.is_expired() {
            return Err(FoundryError::Authentication(format!(
                "static token expired at {}",
                self.token.expires_at
            )));
        }
        Ok(self.token.clone())
    }

    fn cache_key(&self) -> String {
        "static".to_string()
    }
}
