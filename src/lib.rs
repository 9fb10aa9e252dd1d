//! Bundle orchestrator and cluster agent deployer for the GPU cloud-native stack. See
//! `DESIGN.md` for the module-by-module grounding.

pub mod agent_config;
pub mod checksum;
pub mod cli;
pub mod component;
pub mod error;
pub mod http;
pub mod k8s;
pub mod logging;
pub mod orchestrator;
pub mod producers;
pub mod recipe;
