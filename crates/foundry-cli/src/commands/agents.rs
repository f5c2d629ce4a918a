use anyhow::{Context, Result};
use console::style;

use crate::setup::{build_client, load_settings, Overrides};

pub async fn execute(overrides: &Overrides) -> Result<()> {
    let settings = load_settings(overrides)?;
    let client = build_client(&settings)?;

    let agents = client
        .list_agents()
        .await
        .context("Failed to list agents")?;

    if agents.is_empty() {
        println!("{}", style("No agents in this project").dim());
        return Ok(());
    }

    for agent in agents {
        let model = agent.model().unwrap_or("-");
        println!(
            "{}  {}  {}",
            style(&agent.name).bold(),
            style(&agent.id).dim(),
            model
        );
    }
    Ok(())
}
