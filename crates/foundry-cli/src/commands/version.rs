use anyhow::Result;
use console::style;
use foundry::client::DEFAULT_API_VERSION;

/// CLI version and the service API version requests default to
pub fn execute() -> Result<()> {
    println!(
        "{} {} {}",
        style("foundry").bold().green(),
        style(env!("CARGO_PKG_VERSION")).bold(),
        style(format!("(api-version {})", DEFAULT_API_VERSION)).dim()
    );
    Ok(())
}
