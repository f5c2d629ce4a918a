use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{parse_epoch, scope_to_resource, AccessToken, TokenCredential};
use crate::errors::{FoundryError, FoundryResult};

#[cfg(windows)]
const AZ_PROGRAM: &str = "az.cmd";
#[cfg(not(windows))]
const AZ_PROGRAM: &str = "az";

const CLI_TIMEOUT: Duration = Duration::from_secs(10);

/// Tokens from the signed-in Azure CLI session (`az login`)
pub struct AzureCliCredential {
    program: String,
    tenant_id: Option<String>,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self {
            program: AZ_PROGRAM.to_string(),
            tenant_id: None,
        }
    }

    pub fn with_tenant<S: Into<String>>(mut self, tenant_id: S) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Run a different executable in place of `az`
    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scopes: &[String]) -> FoundryResult<AccessToken> {
        let resource = scope_to_resource(scopes)?;

        let mut command = Command::new(&self.program);
        command
            .args(["account", "get-access-token", "--output", "json"])
            .arg("--resource")
            .arg(&resource)
            .kill_on_drop(true);
        if let Some(tenant) = &self.tenant_id {
            command.arg("--tenant").arg(tenant);
        }

        debug!("requesting token from {} for {}", self.program, resource);
        let output = match tokio::time::timeout(CLI_TIMEOUT, command.output()).await {
            Err(_) => {
                return Err(FoundryError::CredentialUnavailable(format!(
                    "{} did not respond within {:?}",
                    self.program, CLI_TIMEOUT
                )))
            }
            Ok(Err(err)) if err.kind() == ErrorKind::NotFound => {
                return Err(FoundryError::CredentialUnavailable(format!(
                    "Azure CLI not found on PATH ({})",
                    self.program
                )))
            }
            Ok(Err(err)) => {
                return Err(FoundryError::Authentication(format!(
                    "failed to run {}: {}",
                    self.program, err
                )))
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(if stderr.contains("az login") || stderr.contains("az account set") {
                FoundryError::CredentialUnavailable(format!(
                    "Azure CLI is not signed in, run `az login`: {}",
                    stderr
                ))
            } else {
                FoundryError::Authentication(stderr)
            });
        }

        parse_cli_token(&String::from_utf8_lossy(&output.stdout))
    }

    fn cache_key(&self) -> String {
        format!(
            "azure_cli:{}",
            self.tenant_id.as_deref().unwrap_or("default")
        )
    }
}

/// Parse the JSON printed by `az account get-access-token`.
///
/// Newer CLI versions emit `expires_on` as epoch seconds; older ones only
/// `expiresOn` as a local-time timestamp.
pub fn parse_cli_token(stdout: &str) -> FoundryResult<AccessToken> {
    let value: Value = serde_json::from_str(stdout).map_err(|e| {
        FoundryError::Authentication(format!("unexpected Azure CLI output: {}", e))
    })?;

    let token = value
        .get("accessToken")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FoundryError::Authentication("accessToken missing from Azure CLI output".into()))?;

    let expires_at = value
        .get("expires_on")
        .and_then(parse_epoch)
        .or_else(|| {
            let local = value.get("expiresOn")?.as_str()?;
            let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f").ok()?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .ok_or_else(|| FoundryError::Authentication("token expiry missing from Azure CLI output".into()))?;

    Ok(AccessToken::new(token, expires_at))
}
