//! Cloud cluster listing command

use anyhow::Result;
use serde_json::Value;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, or_dash, print_warning, OutputFormat};

/// Row for clusters table
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Node Pools")]
    node_pools: usize,
}

impl ClusterRow {
    fn from_value(cluster: &Value) -> Self {
        let text = |key: &str| or_dash(cluster[key].as_str().unwrap_or_default());

        Self {
            name: text("name"),
            region: text("region"),
            version: text("version"),
            state: color_status(&or_dash(
                cluster["status"]["state"].as_str().unwrap_or_default(),
            )),
            node_pools: cluster["node_pools"].as_array().map_or(0, Vec::len),
        }
    }
}

/// List the cloud provider's Kubernetes clusters through the dashboard
pub async fn list_clusters(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let body: Value = client.get("api/agents").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&body)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let rows: Vec<ClusterRow> = body["kubernetes_clusters"]
                .as_array()
                .map(|clusters| clusters.iter().map(ClusterRow::from_value).collect())
                .unwrap_or_default();

            if rows.is_empty() {
                print_warning("No clusters found");
                return Ok(());
            }

            let total = rows.len();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} clusters", total);
        }
    }

    Ok(())
}
