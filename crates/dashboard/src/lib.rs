//! Agent dashboard server
//!
//! Serves agent snapshots over HTTP: a one-shot JSON endpoint, a live
//! server-sent event stream, health checks and Prometheus metrics.

pub mod api;
pub mod config;
