//! Credential sources for authorizing calls to a project
//!
//! Every source implements [`TokenCredential`]: given a set of scopes it hands back
//! a bearer token with an expiry. Sources are cheap to construct and do no I/O
//! until a token is requested. Wrap a source in [`cache::CachedCredential`] to
//! reuse tokens until shortly before they expire.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{FoundryError, FoundryResult};

pub mod azure_cli;
pub mod cache;
pub mod chain;
pub mod client_secret;
pub mod environment;
pub mod factory;
pub mod managed_identity;
pub mod static_token;

/// Scope requested for the Foundry data plane
pub const DEFAULT_SCOPE: &str = "https://ai.azure.com/.default";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    pub fn new<S: Into<String>>(token: S, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// True when the token expires within `margin` from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= Utc::now() + margin
    }
}

/// A source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Fetch a token valid for `scopes`
    async fn get_token(&self, scopes: &[String]) -> FoundryResult<AccessToken>;

    /// Stable identity of this source, used to key persisted tokens
    fn cache_key(&self) -> String;
}

/// Turn a `.default` scope into the resource URI expected by
/// token endpoints that predate scopes (managed identity, Azure CLI).
pub(crate) fn scope_to_resource(scopes: &[String]) -> FoundryResult<String> {
    match scopes {
        [scope] => Ok(scope
            .strip_suffix("/.default")
            .unwrap_or(scope)
            .to_string()),
        _ => Err(FoundryError::InvalidRequest(format!(
            "exactly one scope is supported by this credential, got {}",
            scopes.len()
        ))),
    }
}

/// Seconds-since-epoch given either as a JSON number or a numeric string
pub(crate) fn parse_epoch(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        serde_json::Value::Number(n) => n.as_i64()?,
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::new("secret-value", Utc::now());
        let printed = format!("{:?}", token);
        assert!(!printed.contains("secret-value"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_expiry_checks() {
        let token = AccessToken::new("t", Utc::now() + Duration::minutes(3));
        assert!(!token.is_expired());
        assert!(token.expires_within(Duration::minutes(5)));
        assert!(!token.expires_within(Duration::minutes(1)));

        let stale = AccessToken::new("t", Utc::now() - Duration::seconds(1));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_scope_to_resource() {
        assert_eq!(
            scope_to_resource(&[DEFAULT_SCOPE.to_string()]).unwrap(),
            "https://ai.azure.com"
        );
        assert!(matches!(
            scope_to_resource(&[]),
            Err(FoundryError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_epoch() {
        let expected = DateTime::from_timestamp(1_700_000_000, 0);
        assert_eq!(parse_epoch(&json!(1_700_000_000)), expected);
        assert_eq!(parse_epoch(&json!("1700000000")), expected);
        assert_eq!(parse_epoch(&json!(null)), None);
    }
}
