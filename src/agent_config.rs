//! Configuration for a single cluster agent deployment (§3).

use crate::recipe::{SchedulingPolicy, Toleration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentConfig {
    pub namespace: String,
    pub service_account_name: String,
    pub workload_name: String,
    pub image: String,
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
    /// `cm://namespace/name`, where the agent's `snapshot.yaml` result is written.
    #[serde(rename = "outputURI")]
    pub output_uri: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub privileged: bool,
}

impl AgentConfig {
    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy {
            system_selector: self.node_selector.clone(),
            system_tolerations: self.tolerations.clone(),
            accelerated_selector: BTreeMap::new(),
            accelerated_tolerations: Vec::new(),
        }
    }
}

/// `{enabled: bool}` — when disabled, `Cleanup` is a no-op (resources kept for debugging).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CleanupOptions {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_agent_config() {
        let yaml = "\
namespace: gpu-operators
serviceAccountName: gpu-stack-agent
workloadName: gpu-stack-agent-run-1
image: registry.example/gpu-stack-agent:v1
outputURI: cm://gpu-operators/snap-1
";
        let config: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.namespace, "gpu-operators");
        assert!(!config.debug);
        assert!(!config.privileged);
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "\
namespace: gpu-operators
serviceAccountName: gpu-stack-agent
workloadName: gpu-stack-agent-run-1
image: registry.example/gpu-stack-agent:v1
outputURI: cm://gpu-operators/snap-1
bogusField: true
";
        assert!(serde_yaml::from_str::<AgentConfig>(yaml).is_err());
    }
}
