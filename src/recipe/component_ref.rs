//! Component-ref-based recipe variant: an ordered list of named, versioned component references
//! plus selection criteria and an optional deployment order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Helm,
    Manifest,
    Oci,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    pub version: String,
    #[serde(default = "default_artifact_type")]
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_file: Option<String>,
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

fn default_artifact_type() -> ArtifactType {
    ArtifactType::Helm
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub accelerator: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub os: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentRefRecipe {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub component_refs: Vec<ComponentRef>,
    #[serde(default)]
    pub criteria: Criteria,
    /// A permutation of `component_refs` names, if given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_order: Option<Vec<String>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Recipe".to_string()
}

impl ComponentRefRecipe {
    pub fn component_names(&self) -> Vec<String> {
        self.component_refs.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_artifact_type_is_helm() {
        let json = r#"{"name":"gpu-operator","version":"v25.3.3"}"#;
        let c: ComponentRef = serde_json::from_str(json).unwrap();
        assert_eq!(c.artifact_type, ArtifactType::Helm);
    }

    #[test]
    fn component_names_preserves_order() {
        let recipe = ComponentRefRecipe {
            component_refs: vec![
                ComponentRef {
                    name: "network-operator".into(),
                    version: "v1".into(),
                    artifact_type: ArtifactType::Helm,
                    source: String::new(),
                    values_file: None,
                    overrides: BTreeMap::new(),
                },
                ComponentRef {
                    name: "gpu-operator".into(),
                    version: "v1".into(),
                    artifact_type: ArtifactType::Helm,
                    source: String::new(),
                    values_file: None,
                    overrides: BTreeMap::new(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            recipe.component_names(),
            vec!["network-operator".to_string(), "gpu-operator".to_string()]
        );
    }
}
