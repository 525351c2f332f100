//! Agent dashboard CLI
//!
//! A command-line tool for listing agents, watching the live agent
//! stream and checking the health of the agent dashboard server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{agents, clusters, health};
use output::OutputFormat;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Agent dashboard CLI
#[derive(Parser)]
#[command(name = "agentdash")]
#[command(author, version, about = "CLI for the Agent Dashboard", long_about = None)]
pub struct Cli {
    /// Dashboard server URL (can also be set via AGENTDASH_API_URL env var)
    #[arg(long, env = "AGENTDASH_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List or watch agents
    #[command(subcommand)]
    Agents(AgentsCommands),

    /// List the cloud provider's Kubernetes clusters
    Clusters,

    /// Show dashboard server health and readiness
    Health,
}

#[derive(Subcommand)]
pub enum AgentsCommands {
    /// Fetch the current agent snapshot
    List {
        /// Filter by status (healthy, deploying, warning)
        #[arg(long)]
        status: Option<String>,
    },

    /// Follow the live agent stream
    Watch {
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or(config.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli
        .format
        .or_else(|| config.default_format.as_deref().and_then(OutputFormat::from_name))
        .unwrap_or_default();

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Agents(agents_cmd) => match agents_cmd {
            AgentsCommands::List { status } => {
                agents::list_agents(&client, status, format).await?;
            }
            AgentsCommands::Watch { count } => {
                agents::watch_agents(&client, count, format).await?;
            }
        },
        Commands::Clusters => {
            clusters::list_clusters(&client, format).await?;
        }
        Commands::Health => {
            health::show_health(&client, format).await?;
        }
    }

    Ok(())
}
