use async_trait::async_trait;
use chrono::Duration;
use sha2::Digest;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{AccessToken, TokenCredential};
use crate::errors::FoundryResult;

/// Tokens are refreshed this long before they expire
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

/// On-disk store for tokens, one JSON file per credential identity and scope set
pub struct TokenCache {
    dir: PathBuf,
}

impl TokenCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = sha2::Sha256::new();
        hasher.update(key.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.dir.join(format!("{}.json", hash))
    }

    /// A stored token, unless it is missing, unreadable or already expired
    pub fn load_token(&self, key: &str) -> Option<AccessToken> {
        let contents = fs::read_to_string(self.path_for(key)).ok()?;
        let token: AccessToken = serde_json::from_str(&contents).ok()?;
        (!token.is_expired()).then_some(token)
    }

    pub fn save_token(&self, key: &str, token: &AccessToken) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string(token)?;
        fs::write(self.path_for(key), contents)
    }
}

/// Reuses tokens from `inner` until they are within the refresh margin of expiry.
///
/// Concurrent callers share one lock, so at most one refresh is in flight.
pub struct CachedCredential {
    inner: Arc<dyn TokenCredential>,
    tokens: Mutex<HashMap<String, AccessToken>>,
    store: Option<TokenCache>,
    margin: Duration,
}

impl CachedCredential {
    pub fn new(inner: Arc<dyn TokenCredential>) -> Self {
        Self {
            inner,
            tokens: Mutex::new(HashMap::new()),
            store: None,
            margin: Duration::minutes(REFRESH_MARGIN_MINUTES),
        }
    }

    pub fn with_store(mut self, store: TokenCache) -> Self {
        self.store = Some(store);
        self
    }

    fn key(&self, scopes: &[String]) -> String {
        format!("{}|{}", self.inner.cache_key(), scopes.join(" "))
    }

    fn is_fresh(&self, token: &AccessToken) -> bool {
        !token.expires_within(self.margin)
    }
}

#[async_trait]
impl TokenCredential for CachedCredential {
    async fn get_token(&self, scopes: &[String]) -> FoundryResult<AccessToken> {
        let key = self.key(scopes);
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = tokens.get(&key).filter(|t| self.is_fresh(t)) {
            return Ok(token.clone());
        }

        if let Some(token) = self
            .store
            .as_ref()
            .and_then(|store| store.load_token(&key))
            .filter(|t| self.is_fresh(t))
        {
            debug!("using persisted token for {}", self.inner.cache_key());
            tokens.insert(key, token.clone());
            return Ok(token);
        }

        debug!("refreshing token for {}", self.inner.cache_key());
        let token = self.inner.get_token(scopes).await?;

        if let Some(store) = &self.store {
            if let Err(err) = store.save_token(&key, &token) {
                warn!("could not persist token: {}", err);
            }
        }
        tokens.insert(key, token.clone());
        Ok(token)
    }

    fn cache_key(&self) -> String {
        self.inner.cache_key()
    }
}
