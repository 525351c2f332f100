//! Inventory reader that talks to the Kubernetes API server directly

use super::{async_trait, InventoryProvider};
use crate::error::{Result, SnapshotError};
use crate::models::{Inventory, RawContainer, RawNode, RawPod};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{debug, info};

/// Lists pods and nodes through a `kube` client
pub struct KubeApiProvider {
    client: Client,
}

impl KubeApiProvider {
    /// Connect using in-cluster config or the local kubeconfig
    pub async fn try_default() -> anyhow::Result<Self> {
        debug!("Initializing Kubernetes client");
        let client = Client::try_default().await?;
        info!("Connected to Kubernetes cluster");
        Ok(Self { client })
    }
}

#[async_trait]
impl InventoryProvider for KubeApiProvider {
    async fn read_inventory(&self) -> Result<Inventory> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let nodes: Api<Node> = Api::all(self.client.clone());
        let params = ListParams::default();

        let (pod_list, node_list) = tokio::try_join!(pods.list(&params), nodes.list(&params))
            .map_err(|e| SnapshotError::inventory(format!("Kubernetes API list failed: {}", e)))?;

        Ok(Inventory {
            pods: pod_list.items.iter().map(RawPod::from).collect(),
            nodes: node_list.items.iter().map(RawNode::from).collect(),
        })
    }

    fn name(&self) -> &'static str {
        "kube-api"
    }
}

impl From<&Pod> for RawPod {
    fn from(pod: &Pod) -> Self {
        let metadata = &pod.metadata;
        let spec = pod.spec.as_ref();
        let status = pod.status.as_ref();

        let containers = spec
            .map(|s| {
                s.containers
                    .iter()
                    .map(|c| RawContainer {
                        name: c.name.clone(),
                        limits: c
                            .resources
                            .as_ref()
                            .and_then(|r| r.limits.as_ref())
                            .map(|limits| {
                                limits
                                    .iter()
                                    .map(|(k, q)| (k.clone(), q.0.clone()))
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        RawPod {
            name: metadata.name.clone().unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
            creation_timestamp: metadata.creation_timestamp.as_ref().map(|t| t.0),
            annotations: metadata.annotations.clone().unwrap_or_default(),
            labels: metadata.labels.clone().unwrap_or_default(),
            node_name: spec.and_then(|s| s.node_name.clone()),
            containers,
            phase: status.and_then(|s| s.phase.clone()),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            start_time: status.and_then(|s| s.start_time.as_ref()).map(|t| t.0),
        }
    }
}

impl From<&Node> for RawNode {
    fn from(node: &Node) -> Self {
        RawNode {
            name: node.metadata.name.clone().unwrap_or_default(),
            labels: node.metadata.labels.clone().unwrap_or_default(),
        }
    }
}
