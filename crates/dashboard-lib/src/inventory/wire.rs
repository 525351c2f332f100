//! Parsing of `kubectl get ... -o json` output into raw records
//!
//! The whole document must be valid JSON, but individual items are parsed
//! leniently: every field is optional, and an item that still fails to
//! deserialize is skipped rather than failing the read.

use crate::error::{Result, SnapshotError};
use crate::models::{RawContainer, RawNode, RawPod};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct WireList {
    #[serde(default)]
    items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    name: Option<String>,
    namespace: Option<String>,
    creation_timestamp: Option<String>,
    annotations: Option<BTreeMap<String, serde_json::Value>>,
    labels: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePod {
    metadata: Option<WireMetadata>,
    spec: Option<WirePodSpec>,
    status: Option<WirePodStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePodSpec {
    node_name: Option<String>,
    containers: Option<Vec<WireContainer>>,
}

#[derive(Debug, Default, Deserialize)]
struct WireContainer {
    name: Option<String>,
    resources: Option<WireResources>,
}

#[derive(Debug, Default, Deserialize)]
struct WireResources {
    limits: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePodStatus {
    phase: Option<String>,
    #[serde(rename = "podIP")]
    pod_ip: Option<String>,
    start_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireNode {
    metadata: Option<WireMetadata>,
}

/// Parse the output of `kubectl get pods --all-namespaces -o json`
pub fn parse_pod_list(bytes: &[u8]) -> Result<Vec<RawPod>> {
    Ok(parse_items::<WirePod>(bytes, "pod")?
        .into_iter()
        .map(RawPod::from)
        .collect())
}

/// Parse the output of `kubectl get nodes -o json`
pub fn parse_node_list(bytes: &[u8]) -> Result<Vec<RawNode>> {
    Ok(parse_items::<WireNode>(bytes, "node")?
        .into_iter()
        .map(RawNode::from)
        .collect())
}

fn parse_items<T: DeserializeOwned>(bytes: &[u8], kind: &str) -> Result<Vec<T>> {
    let list: WireList = serde_json::from_slice(bytes)
        .map_err(|e| SnapshotError::inventory(format!("malformed {} list: {}", kind, e)))?;

    let items = list.items.unwrap_or_default();
    let total = items.len();

    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(kind = %kind, error = %e, "Skipping unparsable item");
                None
            }
        })
        .collect();

    if parsed.len() < total {
        debug!(kind = %kind, skipped = total - parsed.len(), "Some items were skipped");
    }

    Ok(parsed)
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Keep only string-valued entries; anything else is not a label
fn string_entries(map: Option<BTreeMap<String, serde_json::Value>>) -> BTreeMap<String, String> {
    map.unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect()
}

fn quantity_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<WirePod> for RawPod {
    fn from(pod: WirePod) -> Self {
        let metadata = pod.metadata.unwrap_or_default();
        let spec = pod.spec.unwrap_or_default();
        let status = pod.status.unwrap_or_default();

        let containers = spec
            .containers
            .unwrap_or_default()
            .into_iter()
            .map(|c| RawContainer {
                name: c.name.unwrap_or_default(),
                limits: c
                    .resources
                    .and_then(|r| r.limits)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(k, v)| quantity_to_string(v).map(|v| (k, v)))
                    .collect(),
            })
            .collect();

        RawPod {
            name: metadata.name.unwrap_or_default(),
            namespace: metadata.namespace.unwrap_or_default(),
            creation_timestamp: parse_timestamp(metadata.creation_timestamp),
            annotations: string_entries(metadata.annotations),
            labels: string_entries(metadata.labels),
            node_name: spec.node_name,
            containers,
            phase: status.phase,
            pod_ip: status.pod_ip,
            start_time: parse_timestamp(status.start_time),
        }
    }
}

impl From<WireNode> for RawNode {
    fn from(node: WireNode) -> Self {
        let metadata = node.metadata.unwrap_or_default();
        RawNode {
            name: metadata.name.unwrap_or_default(),
            labels: string_entries(metadata.labels),
        }
    }
}
