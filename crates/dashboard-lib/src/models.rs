//! Core data models for the agent dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Pod as reported by the orchestrator at read time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPod {
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub node_name: Option<String>,
    pub containers: Vec<RawContainer>,
    pub phase: Option<String>,
    pub pod_ip: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl RawPod {
    /// Label value, treating an empty string as absent
    pub fn label(&self, key: &str) -> Option<&str> {
        non_empty(self.labels.get(key))
    }

    /// Annotation value, treating an empty string as absent
    pub fn annotation(&self, key: &str) -> Option<&str> {
        non_empty(self.annotations.get(key))
    }
}

/// Container spec, reduced to what the view model needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContainer {
    pub name: String,
    /// Resource limits keyed by resource name (`cpu`, `memory`, ...)
    pub limits: BTreeMap<String, String>,
}

/// Node as reported by the orchestrator at read time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawNode {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Result of one inventory read
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub pods: Vec<RawPod>,
    pub nodes: Vec<RawNode>,
}

/// Display status of an agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Healthy,
    #[default]
    Deploying,
    Warning,
}

/// UI-facing record for one agent pod
///
/// Field names are the JSON contract the dashboard pages consume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentView {
    pub id: u32,
    pub name: String,
    pub version: String,
    pub status: AgentStatus,
    pub uptime: String,
    pub endpoint: String,
    pub region: String,
    pub replicas: u32,
    pub cpu: String,
    pub memory: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub language: String,
    pub created: String,
    pub size: String,
    /// Model identifier taken from the `agent-model` annotation
    pub agent: String,
    pub deployed: String,
    pub node: String,
}

/// One self-consistent set of agents produced by a single cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub agents: Vec<AgentView>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Snapshot exactly as the fallback file holds it
///
/// Only the outer shape is checked: a JSON object with an `agents` array.
/// Records inside are never interpreted, so unknown statuses, extra keys and
/// missing keys all reach clients unchanged.
#[derive(Debug, Clone)]
pub struct StoredSnapshot {
    raw: Box<RawValue>,
    agents: usize,
}

impl StoredSnapshot {
    pub fn from_json(text: String) -> std::result::Result<Self, String> {
        let object: Map<String, Value> =
            serde_json::from_str(&text).map_err(|e| e.to_string())?;
        let agents = match object.get("agents") {
            Some(Value::Array(agents)) => agents.len(),
            Some(_) => return Err("`agents` is not an array".to_string()),
            None => return Err("missing `agents` array".to_string()),
        };
        let raw = RawValue::from_string(text).map_err(|e| e.to_string())?;
        Ok(Self { raw, agents })
    }

    pub fn len(&self) -> usize {
        self.agents
    }

    pub fn is_empty(&self) -> bool {
        self.agents == 0
    }

    /// The stored JSON text
    pub fn as_json(&self) -> &str {
        self.raw.get()
    }
}

impl PartialEq for StoredSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.as_json() == other.as_json()
    }
}

impl Serialize for StoredSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// What one cycle hands to clients: classified agents or the stored file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SnapshotPayload {
    Live(Snapshot),
    Stored(StoredSnapshot),
}

impl SnapshotPayload {
    pub fn empty() -> Self {
        SnapshotPayload::Live(Snapshot::empty())
    }

    pub fn len(&self) -> usize {
        match self {
            SnapshotPayload::Live(snapshot) => snapshot.len(),
            SnapshotPayload::Stored(stored) => stored.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Classified agents, if this payload came from a live read
    pub fn live_agents(&self) -> Option<&[AgentView]> {
        match self {
            SnapshotPayload::Live(snapshot) => Some(&snapshot.agents),
            SnapshotPayload::Stored(_) => None,
        }
    }
}

impl From<Snapshot> for SnapshotPayload {
    fn from(snapshot: Snapshot) -> Self {
        SnapshotPayload::Live(snapshot)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}
