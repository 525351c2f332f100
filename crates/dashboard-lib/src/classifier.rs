//! Agent classification and view-model construction
//!
//! Turns raw pod and node records into the [`Snapshot`] the dashboard renders.
//! Everything here is synchronous and infallible: missing or malformed fields
//! degrade to empty strings instead of failing the snapshot.

use crate::models::{AgentStatus, AgentView, RawNode, RawPod, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Placeholder values for fields the cluster has no source for
pub mod defaults {
    pub const VERSION: &str = "1.0.0";
    pub const LANGUAGE: &str = "Python";
    pub const SIZE: &str = "N/A";
    pub const DEPLOYED: &str = "testing";
    pub const REPLICAS: u32 = 1;
}

/// Well-known label and annotation keys
pub mod keys {
    pub const APP: &str = "app";
    pub const AGENT_TYPE: &str = "agent-type";
    pub const AGENT_ID: &str = "agent-id";
    pub const AGENT_MODEL: &str = "agent-model";

    /// Node labels carrying the region, highest priority first
    pub const REGION_LABELS: [&str; 3] = [
        "topology.kubernetes.io/region",
        "failure-domain.beta.kubernetes.io/region",
        "region",
    ];
}

/// `app` label fragment that marks shared infrastructure
const INFRA_MARKER: &str = "mongodb";

/// Build a snapshot from one inventory read
///
/// Ids are 1-based positions in the filtered pod sequence, so they are only
/// meaningful within the returned snapshot.
pub fn build_snapshot(pods: &[RawPod], nodes: &[RawNode], now: DateTime<Utc>) -> Snapshot {
    let regions = region_map(nodes);

    let agents = pods
        .iter()
        .filter(|pod| is_agent(pod))
        .zip(1u32..)
        .map(|(pod, id)| build_agent_view(id, pod, &regions, now))
        .collect();

    Snapshot { agents }
}

/// Decide whether a pod represents an agent
///
/// Any one marker includes the pod, but infrastructure pods are excluded
/// even when they carry a marker.
pub fn is_agent(pod: &RawPod) -> bool {
    let app = pod.label(keys::APP).unwrap_or_default();

    let has_marker = app.contains("agent")
        || pod.label(keys::AGENT_TYPE).is_some()
        || pod.annotation(keys::AGENT_ID).is_some();

    has_marker && !app.contains(INFRA_MARKER)
}

/// Map node name to region from node topology labels
pub fn region_map(nodes: &[RawNode]) -> HashMap<&str, &str> {
    nodes
        .iter()
        .map(|node| {
            let region = keys::REGION_LABELS
                .iter()
                .filter_map(|key| node.labels.get(*key))
                .map(String::as_str)
                .find(|value| !value.is_empty())
                .unwrap_or_default();
            (node.name.as_str(), region)
        })
        .collect()
}

fn build_agent_view(
    id: u32,
    pod: &RawPod,
    regions: &HashMap<&str, &str>,
    now: DateTime<Utc>,
) -> AgentView {
    let app_label = pod
        .label(keys::APP)
        .or(Some(pod.name.as_str()).filter(|name| !name.is_empty()))
        .unwrap_or("agent");
    let base = app_label.strip_suffix("-agent").unwrap_or(app_label);
    let stem = strip_agent_suffix(base);

    let agent_type = pod
        .label(keys::AGENT_TYPE)
        .map(str::to_string)
        .unwrap_or_else(|| stem.to_string());

    let node = pod.node_name.clone().unwrap_or_default();
    let region = regions.get(node.as_str()).copied().unwrap_or_default();

    let limits = pod.containers.first().map(|c| &c.limits);
    let limit = |resource: &str| {
        limits
            .and_then(|l| l.get(resource))
            .cloned()
            .unwrap_or_default()
    };

    AgentView {
        id,
        name: format!("{} Agent", to_title(stem)),
        version: defaults::VERSION.to_string(),
        status: phase_to_status(pod.phase.as_deref()),
        uptime: format_uptime(pod.start_time, now),
        endpoint: pod
            .pod_ip
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .map(|ip| format!("http://{}", ip))
            .unwrap_or_default(),
        region: region.to_string(),
        replicas: defaults::REPLICAS,
        cpu: limit("cpu"),
        memory: limit("memory"),
        agent_type,
        language: defaults::LANGUAGE.to_string(),
        created: pod
            .creation_timestamp
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        size: defaults::SIZE.to_string(),
        agent: pod
            .annotation(keys::AGENT_MODEL)
            .unwrap_or_default()
            .to_string(),
        deployed: defaults::DEPLOYED.to_string(),
        node,
    }
}

/// Strip one optional trailing `agent` or `-agent`
fn strip_agent_suffix(value: &str) -> &str {
    value
        .strip_suffix("-agent")
        .or_else(|| value.strip_suffix("agent"))
        .unwrap_or(value)
}

/// Title-case a slug: split on `-`, `_` and whitespace, capitalize each word
pub fn to_title(value: &str) -> String {
    value
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a pod phase to a display status (case-insensitive)
pub fn phase_to_status(phase: Option<&str>) -> AgentStatus {
    match phase.unwrap_or_default().to_lowercase().as_str() {
        "running" => AgentStatus::Healthy,
        "pending" => AgentStatus::Deploying,
        "failed" | "unknown" => AgentStatus::Warning,
        _ => AgentStatus::Deploying,
    }
}

/// Format the time since `start` as `{d}d {h}h {m}m`
///
/// Leading zero components are dropped; minutes are always present.
/// A start in the future counts as zero.
pub fn format_uptime(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(start) = start else {
        return String::new();
    };

    let total_minutes = (now - start).num_minutes().max(0);
    let days = total_minutes / (60 * 24);
    let hours = (total_minutes % (60 * 24)) / 60;
    let minutes = total_minutes % 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    parts.push(format!("{}m", minutes));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawContainer;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn pod_with_app(app: &str) -> RawPod {
        let mut pod = RawPod {
            name: format!("{}-7d9f8-abcde", app),
            namespace: "default".to_string(),
            ..Default::default()
        };
        pod.labels.insert("app".to_string(), app.to_string());
        pod
    }

    fn node(name: &str, labels: &[(&str, &str)]) -> RawNode {
        RawNode {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_exclusion_dominates_markers() {
        let pod = pod_with_app("mongodb-agent-sidecar");
        assert!(!is_agent(&pod));

        let mut pod = pod_with_app("mongodb");
        pod.labels
            .insert("agent-type".to_string(), "storage".to_string());
        assert!(!is_agent(&pod));
    }

    #[test]
    fn test_inclusion_via_annotation_only() {
        let mut pod = pod_with_app("checkout");
        assert!(!is_agent(&pod));

        pod.annotations
            .insert("agent-id".to_string(), "a-123".to_string());
        assert!(is_agent(&pod));
    }

    #[test]
    fn test_inclusion_via_agent_type_label() {
        let mut pod = RawPod {
            name: "worker-0".to_string(),
            ..Default::default()
        };
        pod.labels
            .insert("agent-type".to_string(), "research".to_string());
        assert!(is_agent(&pod));

        let snapshot = build_snapshot(&[pod], &[], now());
        let view = &snapshot.agents[0];
        assert_eq!(view.agent_type, "research");
        assert_eq!(view.name, "Worker 0 Agent");
    }

    #[test]
    fn test_empty_markers_do_not_include() {
        let mut pod = pod_with_app("web");
        pod.labels.insert("agent-type".to_string(), String::new());
        pod.annotations.insert("agent-id".to_string(), String::new());
        assert!(!is_agent(&pod));
    }

    #[test]
    fn test_name_and_type_derivation() {
        let snapshot = build_snapshot(&[pod_with_app("billing-agent")], &[], now());
        let view = &snapshot.agents[0];

        assert_eq!(view.name, "Billing Agent");
        assert_eq!(view.agent_type, "billing");
    }

    #[test]
    fn test_name_derivation_variants() {
        let cases = [
            ("customer_support-agent", "Customer Support Agent", "customer_support"),
            ("researchagent", "Research Agent", "research"),
            ("agent-router", "Agent Router Agent", "agent-router"),
        ];

        for (app, name, agent_type) in cases {
            let snapshot = build_snapshot(&[pod_with_app(app)], &[], now());
            assert_eq!(snapshot.agents[0].name, name, "name for {}", app);
            assert_eq!(snapshot.agents[0].agent_type, agent_type, "type for {}", app);
        }
    }

    #[test]
    fn test_agent_type_label_overrides_derived_type() {
        let mut pod = pod_with_app("billing-agent");
        pod.labels
            .insert("agent-type".to_string(), "finance".to_string());

        let snapshot = build_snapshot(&[pod], &[], now());
        assert_eq!(snapshot.agents[0].agent_type, "finance");
        assert_eq!(snapshot.agents[0].name, "Billing Agent");
    }

    #[test]
    fn test_to_title() {
        assert_eq!(to_title("customer-support"), "Customer Support");
        assert_eq!(to_title("a__b  c"), "A B C");
        assert_eq!(to_title(""), "");
    }

    #[test]
    fn test_phase_to_status() {
        assert_eq!(phase_to_status(Some("Running")), AgentStatus::Healthy);
        assert_eq!(phase_to_status(Some("PENDING")), AgentStatus::Deploying);
        assert_eq!(phase_to_status(Some("Failed")), AgentStatus::Warning);
        assert_eq!(phase_to_status(Some("Unknown")), AgentStatus::Warning);
        assert_eq!(phase_to_status(Some("Succeeded")), AgentStatus::Deploying);
        assert_eq!(phase_to_status(None), AgentStatus::Deploying);
    }

    #[test]
    fn test_format_uptime() {
        let now = now();
        assert_eq!(format_uptime(Some(now - Duration::minutes(90)), now), "1h 30m");
        assert_eq!(format_uptime(None, now), "");
        assert_eq!(format_uptime(Some(now), now), "0m");
        assert_eq!(
            format_uptime(Some(now - Duration::days(3) - Duration::minutes(7)), now),
            "3d 7m"
        );
        assert_eq!(
            format_uptime(Some(now - Duration::seconds(59)), now),
            "0m"
        );
        assert_eq!(format_uptime(Some(now + Duration::hours(1)), now), "0m");
    }

    #[test]
    fn test_region_precedence() {
        let nodes = [
            node(
                "node-a",
                &[("topology.kubernetes.io/region", "us-east"), ("region", "eu-west")],
            ),
            node(
                "node-b",
                &[
                    ("failure-domain.beta.kubernetes.io/region", "ap-south"),
                    ("region", "eu-west"),
                ],
            ),
            node("node-c", &[("region", "eu-west")]),
            node("node-d", &[("zone", "z1")]),
        ];
        let regions = region_map(&nodes);

        assert_eq!(regions["node-a"], "us-east");
        assert_eq!(regions["node-b"], "ap-south");
        assert_eq!(regions["node-c"], "eu-west");
        assert_eq!(regions["node-d"], "");
    }

    #[test]
    fn test_unknown_node_and_missing_containers_default_to_empty() {
        let mut pod = pod_with_app("support-agent");
        pod.node_name = Some("node-x".to_string());

        let snapshot = build_snapshot(&[pod], &[node("node-a", &[("region", "us")])], now());
        let view = &snapshot.agents[0];

        assert_eq!(view.region, "");
        assert_eq!(view.cpu, "");
        assert_eq!(view.memory, "");
        assert_eq!(view.endpoint, "");
        assert_eq!(view.uptime, "");
        assert_eq!(view.created, "");
        assert_eq!(view.node, "node-x");
    }

    #[test]
    fn test_limits_and_metadata_fields() {
        let mut pod = pod_with_app("writer-agent");
        pod.containers = vec![
            RawContainer {
                name: "main".to_string(),
                limits: [
                    ("cpu".to_string(), "500m".to_string()),
                    ("memory".to_string(), "1Gi".to_string()),
                ]
                .into_iter()
                .collect(),
            },
            RawContainer {
                name: "sidecar".to_string(),
                limits: [("cpu".to_string(), "100m".to_string())].into_iter().collect(),
            },
        ];
        pod.annotations
            .insert("agent-model".to_string(), "gpt-4o".to_string());
        pod.creation_timestamp = Some(Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap());

        let snapshot = build_snapshot(&[pod], &[], now());
        let view = &snapshot.agents[0];

        assert_eq!(view.cpu, "500m");
        assert_eq!(view.memory, "1Gi");
        assert_eq!(view.agent, "gpt-4o");
        assert_eq!(view.created, "2024-03-09");
        assert_eq!(view.version, "1.0.0");
        assert_eq!(view.language, "Python");
        assert_eq!(view.size, "N/A");
        assert_eq!(view.deployed, "testing");
        assert_eq!(view.replicas, 1);
    }

    #[test]
    fn test_ids_follow_filtered_order() {
        let pods = [
            pod_with_app("alpha-agent"),
            pod_with_app("nginx"),
            pod_with_app("beta-agent"),
            pod_with_app("mongodb"),
            pod_with_app("gamma-agent"),
        ];

        let snapshot = build_snapshot(&pods, &[], now());
        let ids: Vec<_> = snapshot.agents.iter().map(|a| (a.id, a.name.as_str())).collect();

        assert_eq!(
            ids,
            vec![(1, "Alpha Agent"), (2, "Beta Agent"), (3, "Gamma Agent")]
        );

        // Rebuilding restarts numbering
        let again = build_snapshot(&pods[2..], &[], now());
        assert_eq!(again.agents[0].id, 1);
    }

    #[test]
    fn test_no_agents_yields_empty_snapshot() {
        let snapshot = build_snapshot(&[pod_with_app("redis")], &[], now());
        assert!(snapshot.is_empty());
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), r#"{"agents":[]}"#);
    }

    #[test]
    fn test_degenerate_pods_never_panic() {
        let mut nameless = RawPod::default();
        nameless
            .annotations
            .insert("agent-id".to_string(), "x".to_string());

        let mut bare_agent = pod_with_app("agent");
        bare_agent.pod_ip = Some(String::new());
        bare_agent.phase = Some(String::new());

        let snapshot = build_snapshot(&[nameless, bare_agent], &[], now());
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.agents[0].agent_type, "");
        assert_eq!(snapshot.agents[1].endpoint, "");
        assert_eq!(snapshot.agents[1].status, AgentStatus::Deploying);
    }

    #[test]
    fn test_end_to_end_two_pods() {
        let now = now();

        let mut support = pod_with_app("support-agent");
        support.phase = Some("Running".to_string());
        support.pod_ip = Some("10.0.0.5".to_string());
        support.start_time = Some(now - Duration::hours(2) - Duration::minutes(5));
        support.node_name = Some("node-a".to_string());

        let mut mongo = pod_with_app("mongodb");
        mongo.phase = Some("Running".to_string());

        let nodes = [node("node-a", &[("region", "us-west")])];
        let snapshot = build_snapshot(&[support, mongo], &nodes, now);

        assert_eq!(snapshot.len(), 1);
        let view = &snapshot.agents[0];
        assert_eq!(view.id, 1);
        assert_eq!(view.name, "Support Agent");
        assert_eq!(view.status, AgentStatus::Healthy);
        assert_eq!(view.uptime, "2h 5m");
        assert_eq!(view.endpoint, "http://10.0.0.5");
        assert_eq!(view.region, "us-west");
        assert_eq!(view.agent_type, "support");
    }
}
