mod commands;
mod setup;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use foundry::errors::FoundryError;
use tracing_subscriber::EnvFilter;

use commands::agents::execute as agents_execute;
use commands::ask::execute as ask_execute;
use commands::version::execute as version_execute;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project endpoint (can also be set via FOUNDRY_PROJECT__ENDPOINT or AZURE_AI_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Agent to talk to (can also be set via FOUNDRY_PROJECT__AGENT_NAME or AZURE_AGENT_NAME)
    #[arg(short, long, global = true)]
    agent: Option<String>,

    /// Credential source: default, environment, managed_identity, azure_cli or token
    #[arg(long, global = true)]
    credential: Option<String>,

    /// Message to send when no subcommand is given
    #[arg(short, long)]
    message: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the agent and send it one message
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the agents in the project
    Agents,

    /// Print the version
    Version,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = setup::Overrides {
        endpoint: cli.endpoint,
        agent: cli.agent,
        credential: cli.credential,
    };

    match cli.command {
        Some(Command::Ask { message }) => ask_execute(&overrides, message.or(cli.message)).await,
        Some(Command::Agents) => agents_execute(&overrides).await,
        Some(Command::Version) => version_execute(),
        None => ask_execute(&overrides, cli.message).await,
    }
}

fn report(err: &anyhow::Error) {
    eprintln!("{} {:#}", style("error:").red().bold(), err);

    let hint = match err.downcast_ref::<FoundryError>() {
        Some(FoundryError::Authentication(_)) => {
            Some("sign in with `az login` or set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET")
        }
        Some(FoundryError::Permission(_)) => {
            Some("the signed-in principal needs a role on the Foundry project, such as Azure AI User")
        }
        Some(FoundryError::NotFound(_)) => Some("run `foundry agents` to see the agents in this project"),
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("{} {}", style("hint:").yellow(), hint);
    }
}
