//! Agent dashboard library
//!
//! This crate provides the core functionality for:
//! - Reading pod and node inventory from Kubernetes
//! - Classifying agent pods into a dashboard view model
//! - Falling back to a stored snapshot when the cluster is unreachable
//! - Publishing snapshots to live subscribers
//! - Health checks and observability

pub mod classifier;
pub mod clusters;
pub mod error;
pub mod fallback;
pub mod health;
pub mod inventory;
pub mod models;
pub mod observability;
pub mod publisher;
pub mod source;

pub use classifier::build_snapshot;
pub use error::SnapshotError;
pub use fallback::FallbackStore;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use inventory::{InventoryBackend, InventoryProvider};
pub use models::*;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use publisher::{PublisherConfig, PublisherHandle, SnapshotPublisher, Subscription};
pub use source::{SnapshotOrigin, SnapshotSource};
