use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::client::{ClientOptions, DEFAULT_API_VERSION};
use crate::credentials::DEFAULT_SCOPE;
use crate::errors::FoundryError;
use crate::retry::RetryConfig;

pub const ENV_PREFIX: &str = "FOUNDRY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration, set {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

impl From<ConfigError> for FoundryError {
    fn from(err: ConfigError) -> Self {
        FoundryError::Config(err.to_string())
    }
}

/// `project.endpoint` → `FOUNDRY_PROJECT__ENDPOINT`
pub fn to_env_var(key: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        key.split('.')
            .map(|part| part.to_uppercase())
            .collect::<Vec<_>>()
            .join("__")
    )
}

#[derive(Debug, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    endpoint: Option<String>,
    pub agent_name: String,
    pub api_version: String,
}

impl ProjectSettings {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_interval: Duration::from_millis(self.max_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// environment, then managed identity, then Azure CLI
    #[default]
    Default,
    Environment,
    ManagedIdentity,
    AzureCli,
    Token,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialSettings {
    #[serde(default)]
    pub kind: CredentialKind,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub project: ProjectSettings,
    pub http: HttpSettings,
    pub retry: RetrySettings,
    #[serde(default)]
    pub credential: CredentialSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_overrides(&[])
    }

    /// Load settings, with `overrides` (dotted key, value) taking precedence over
    /// the config file and the environment.
    pub fn with_overrides(overrides: &[(&str, String)]) -> Result<Self, ConfigError> {
        Self::load(&[], overrides)
    }

    /// Like [`Settings::with_overrides`], with `fallbacks` sitting below the config
    /// file and the environment but above the built-in defaults.
    pub fn load(
        fallbacks: &[(&str, String)],
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        let defaults = RetryConfig::default();
        let mut builder = Config::builder()
            .set_default("project.agent_name", "DemoAgent")?
            .set_default("project.api_version", DEFAULT_API_VERSION)?
            .set_default("http.timeout_secs", 120i64)?
            .set_default("retry.max_retries", defaults.max_retries as i64)?
            .set_default(
                "retry.initial_interval_ms",
                defaults.initial_interval.as_millis() as i64,
            )?
            .set_default("retry.backoff_multiplier", defaults.backoff_multiplier)?
            .set_default(
                "retry.max_interval_ms",
                defaults.max_interval.as_millis() as i64,
            )?;

        for (key, value) in fallbacks {
            builder = builder.set_default(*key, value.as_str())?;
        }

        builder = builder
            .add_source(File::with_name("foundry").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }

        let settings: Self = builder.build()?.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match &err {
                config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                },
                _ => ConfigError::Other(err),
            }
        })?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.project.endpoint().trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("project.endpoint"),
            });
        }
        if self.project.agent_name.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("project.agent_name"),
            });
        }
        if self.credential.kind == CredentialKind::Token && self.credential.token.is_none() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("credential.token"),
            });
        }
        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_version: self.project.api_version.clone(),
            timeout: Duration::from_secs(self.http.timeout_secs),
            retry: self.retry.to_retry_config(),
            scopes: vec![DEFAULT_SCOPE.to_string()],
        }
    }
}
