use anyhow::{Context, Result};
use foundry::client::ProjectClient;
use foundry::configuration::Settings;
use foundry::credentials::factory::get_credential;
use std::env;
use tracing::debug;

/// Environment variables used by earlier versions of the Foundry samples,
/// consulted only when neither `foundry.toml` nor `FOUNDRY_*` set the key
const LEGACY_VARS: [(&str, &str); 2] = [
    ("project.endpoint", "AZURE_AI_ENDPOINT"),
    ("project.agent_name", "AZURE_AGENT_NAME"),
];

/// Values given on the command line; they win over the config file and environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub agent: Option<String>,
    pub credential: Option<String>,
}

impl Overrides {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("project.endpoint", &self.endpoint),
            ("project.agent_name", &self.agent),
            ("credential.kind", &self.credential),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

fn legacy_fallbacks() -> Vec<(&'static str, String)> {
    LEGACY_VARS
        .into_iter()
        .filter_map(|(key, var)| {
            env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (key, v))
        })
        .collect()
}

pub fn load_settings(overrides: &Overrides) -> Result<Settings> {
    let settings = Settings::load(&legacy_fallbacks(), &overrides.pairs())
        .context("Failed to load configuration")?;
    debug!("settings: {:?}", settings.project);
    Ok(settings)
}

pub fn build_client(settings: &Settings) -> Result<ProjectClient> {
    let credential = get_credential(&settings.credential)?;
    Ok(ProjectClient::from_settings(settings, credential)?)
}
