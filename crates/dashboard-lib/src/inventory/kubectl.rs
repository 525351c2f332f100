//! Inventory reader that shells out to `kubectl`

use super::wire::{parse_node_list, parse_pod_list};
use super::{async_trait, InventoryProvider};
use crate::error::{Result, SnapshotError};
use crate::models::Inventory;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Reads pods and nodes via `kubectl get ... -o json`
///
/// Both queries run concurrently; either failing fails the whole read.
#[derive(Debug, Clone)]
pub struct KubectlProvider {
    program: String,
}

impl KubectlProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!(program = %self.program, args = ?args, "Running inventory query");

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SnapshotError::inventory(format!("failed to spawn {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SnapshotError::inventory(format!(
                "`{} {}` exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

impl Default for KubectlProvider {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

#[async_trait]
impl InventoryProvider for KubectlProvider {
    async fn read_inventory(&self) -> Result<Inventory> {
        let (pods, nodes) = tokio::try_join!(
            self.run(&["get", "pods", "--all-namespaces", "-o", "json"]),
            self.run(&["get", "nodes", "-o", "json"]),
        )?;

        Ok(Inventory {
            pods: parse_pod_list(&pods)?,
            nodes: parse_node_list(&nodes)?,
        })
    }

    fn name(&self) -> &'static str {
        "kubectl"
    }
}
