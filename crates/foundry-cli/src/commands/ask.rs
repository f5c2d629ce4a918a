use anyhow::{Context, Result};
use console::style;
use tracing::info;

use crate::setup::{build_client, load_settings, Overrides};

pub const DEFAULT_MESSAGE: &str = "Tell me what you can help with.";

pub async fn execute(overrides: &Overrides, message: Option<String>) -> Result<()> {
    let settings = load_settings(overrides)?;
    let client = build_client(&settings)?;
    let agent_name = &settings.project.agent_name;

    let agent = client
        .get_agent_by_name(agent_name)
        .await
        .with_context(|| format!("Failed to retrieve agent '{}'", agent_name))?;
    println!("Retrieved agent: {}", agent.name);

    let message = message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
    let response = client
        .ask(&agent, &message)
        .await
        .with_context(|| format!("Failed to get a response from '{}'", agent.name))?;

    for refusal in response.refusals() {
        eprintln!("{} {}", style("refused:").yellow(), refusal);
    }
    if let Some(usage) = &response.usage {
        info!(
            "tokens: {} in, {} out, {} total",
            usage.input_tokens.unwrap_or_default(),
            usage.output_tokens.unwrap_or_default(),
            usage.total().unwrap_or_default()
        );
    }

    println!("Response output: {}", response.output_text());
    Ok(())
}
