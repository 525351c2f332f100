//! Agent listing and live watch commands

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{Agent, AgentSnapshot, ApiClient};
use crate::output::{color_status, or_dash, print_info, print_warning, OutputFormat};

/// Row for agents table
#[derive(Tabled)]
struct AgentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Type")]
    agent_type: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Endpoint")]
    endpoint: String,
}

impl From<&Agent> for AgentRow {
    fn from(agent: &Agent) -> Self {
        Self {
            id: display_id(&agent.id),
            name: agent.name.clone(),
            status: color_status(&agent.status),
            agent_type: or_dash(&agent.agent_type),
            version: or_dash(&agent.version),
            region: or_dash(&agent.region),
            node: or_dash(&agent.node),
            uptime: or_dash(&agent.uptime),
            cpu: or_dash(&agent.cpu),
            memory: or_dash(&agent.memory),
            endpoint: or_dash(&agent.endpoint),
        }
    }
}

/// Fetch one snapshot and print it
pub async fn list_agents(
    client: &ApiClient,
    status: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut snapshot: AgentSnapshot = client.get("api/agents/refresh").await?;

    if let Some(status) = &status {
        snapshot
            .agents
            .retain(|agent| agent.status.eq_ignore_ascii_case(status));
    }

    print_snapshot(&snapshot, format)
}

/// Follow the live stream, reprinting on every snapshot
///
/// Stops after `count` snapshots, on Ctrl-C, or when the server closes the stream.
pub async fn watch_agents(client: &ApiClient, count: Option<usize>, format: OutputFormat) -> Result<()> {
    let mut stream = client.stream("api/agents/stream").await?;
    let mut received = 0usize;

    if format == OutputFormat::Table {
        print_info("Watching agents, press Ctrl-C to stop");
    }

    loop {
        if count.is_some_and(|limit| received >= limit) {
            break;
        }

        let data = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = stream.next_event() => match event? {
                Some(data) => data,
                None => {
                    print_warning("Server closed the stream");
                    break;
                }
            },
        };

        let snapshot: AgentSnapshot =
            serde_json::from_str(&data).context("Failed to parse snapshot event")?;
        received += 1;

        if format == OutputFormat::Table {
            println!();
            println!(
                "{} {}",
                "Snapshot at".bold(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }
        print_snapshot(&snapshot, format)?;
    }

    Ok(())
}

fn display_id(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_snapshot(snapshot: &AgentSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(snapshot)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if snapshot.agents.is_empty() {
                print_warning("No agents found");
                return Ok(());
            }

            let rows: Vec<AgentRow> = snapshot.agents.iter().map(AgentRow::from).collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} agents", snapshot.agents.len());
        }
    }

    Ok(())
}
