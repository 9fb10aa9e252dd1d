//! Cluster agent deployer (§4.5–§4.8): access resources, workload, lifecycle orchestration, and
//! the output locator, built on a narrow mockable [`client::ClusterClient`] port.

pub mod access;
pub mod client;
pub mod labels;
pub mod lifecycle;
pub mod locator;
pub mod permissions;
pub mod workload;

pub use client::{ClusterClient, KubeClusterClient};
pub use lifecycle::AgentLifecycle;
