//! The umbrella producer (§2.1): writes the archive-root files every bundle carries regardless
//! of which components were selected — `Chart.yaml`, `values.yaml`, `README.md`, and
//! `recipe.yaml`. Always selected by the orchestrator, independent of `selectedTypes` filtering.
//! Grounded in the way the reference project's `agent_type` module renders one source of truth
//! (a parsed definition) into several output artifacts.

use crate::component::{ComponentConfig, Producer, ProducerResult};
use crate::error::{Error, Result};
use crate::recipe::Recipe;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub const TAG: &str = "umbrella";

pub struct UmbrellaProducer {
    version: String,
    overrides: crate::recipe::OverrideSet,
    scheduling: crate::recipe::SchedulingPolicy,
    include_readme: bool,
}

impl UmbrellaProducer {
    pub fn new(config: &ComponentConfig) -> Self {
        Self {
            version: config.version(),
            overrides: config.value_overrides(),
            scheduling: config.scheduling_policy(),
            include_readme: config.include_readme(),
        }
    }

    fn chart_yaml(&self, recipe: &Recipe) -> String {
        #[derive(Serialize)]
        struct Dependency {
            name: String,
            version: String,
            repository: String,
        }
        #[derive(Serialize)]
        struct Chart {
            #[serde(rename = "apiVersion")]
            api_version: &'static str,
            name: &'static str,
            version: String,
            dependencies: Vec<Dependency>,
        }

        let dependencies = match recipe.as_component_ref() {
            Some(r) => {
                let ordered_names = self.dependency_order(r);
                ordered_names
                    .into_iter()
                    .filter_map(|name| {
                        r.component_refs.iter().find(|c| c.name == name).map(|c| Dependency {
                            name: c.name.clone(),
                            version: c.version.clone(),
                            repository: c.source.clone(),
                        })
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        let chart = Chart {
            api_version: "v2",
            name: "gpu-stack-bundle",
            version: self.version.clone(),
            dependencies,
        };
        serde_yaml::to_string(&chart).unwrap_or_default()
    }

    /// Honors `deploymentOrder` when present; falls back to recipe order otherwise.
    fn dependency_order(&self, r: &crate::recipe::ComponentRefRecipe) -> Vec<String> {
        match &r.deployment_order {
            Some(order) => order.clone(),
            None => r.component_names(),
        }
    }

    fn values_yaml(&self) -> String {
        #[derive(Serialize)]
        struct Values {
            global: Global,
            #[serde(rename = "valueOverrides")]
            value_overrides: crate::recipe::OverrideSet,
        }
        #[derive(Serialize)]
        struct Global {
            #[serde(rename = "systemSelector")]
            system_selector: BTreeMap<String, String>,
            #[serde(rename = "systemTolerations")]
            system_tolerations: Vec<crate::recipe::Toleration>,
            #[serde(rename = "acceleratedSelector")]
            accelerated_selector: BTreeMap<String, String>,
            #[serde(rename = "acceleratedTolerations")]
            accelerated_tolerations: Vec<crate::recipe::Toleration>,
        }

        let values = Values {
            global: Global {
                system_selector: self.scheduling.system_selector.clone(),
                system_tolerations: self.scheduling.system_tolerations.clone(),
                accelerated_selector: self.scheduling.accelerated_selector.clone(),
                accelerated_tolerations: self.scheduling.accelerated_tolerations.clone(),
            },
            value_overrides: self.overrides.clone(),
        };
        serde_yaml::to_string(&values).unwrap_or_default()
    }

    fn readme_md(&self, recipe: &Recipe) -> String {
        let mut out = String::from("# GPU Stack Bundle\n\n");
        out.push_str(&format!("Version: {}\n\n", self.version));
        out.push_str("## Components\n\n");
        for name in recipe.component_names() {
            out.push_str(&format!("- {name}\n"));
        }
        out
    }
}

#[async_trait]
impl Producer for UmbrellaProducer {
    async fn make(
        &self,
        _cancellation: CancellationToken,
        recipe: &Recipe,
        output_dir: &Path,
    ) -> Result<ProducerResult> {
        let mut result = ProducerResult::new(TAG);

        let recipe_yaml = serde_yaml::to_string(recipe)
            .map_err(|e| Error::internal(format!("serializing recipe: {e}")))?;

        let mut files: Vec<(&str, String)> = vec![
            ("Chart.yaml", self.chart_yaml(recipe)),
            ("values.yaml", self.values_yaml()),
            ("recipe.yaml", recipe_yaml),
        ];
        if self.include_readme {
            files.push(("README.md", self.readme_md(recipe)));
        }

        for (name, contents) in files {
            let path = output_dir.join(name);
            if let Err(e) = std::fs::write(&path, &contents) {
                result.add_error(format!("writing {}: {e}", path.display()));
                continue;
            }
            result.add_file(name, contents.len() as u64);
        }

        result.mark_success();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{ComponentRef, ComponentRefRecipe};
    use std::collections::BTreeMap as Map;

    fn two_component_recipe() -> Recipe {
        Recipe::ComponentRef(ComponentRefRecipe {
            component_refs: vec![
                ComponentRef {
                    name: "network-operator".into(),
                    version: "v1".into(),
                    artifact_type: crate::recipe::component_ref::ArtifactType::Helm,
                    source: "https://example/charts/network-operator".into(),
                    values_file: None,
                    overrides: Map::new(),
                },
                ComponentRef {
                    name: "gpu-operator".into(),
                    version: "v25.3.3".into(),
                    artifact_type: crate::recipe::component_ref::ArtifactType::Helm,
                    source: "https://example/charts/gpu-operator".into(),
                    values_file: None,
                    overrides: Map::new(),
                },
            ],
            deployment_order: Some(vec!["gpu-operator".into(), "network-operator".into()]),
            ..Default::default()
        })
    }

    /// S3: the minimal valid recipe produces the four archive-root files.
    #[tokio::test]
    async fn scenario_s3_writes_four_root_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ComponentConfig::builder().build().unwrap();
        let producer = UmbrellaProducer::new(&config);
        let recipe = Recipe::ComponentRef(ComponentRefRecipe {
            component_refs: vec![ComponentRef {
                name: "gpu-operator".into(),
                version: "v25.3.3".into(),
                artifact_type: crate::recipe::component_ref::ArtifactType::Helm,
                source: String::new(),
                values_file: None,
                overrides: Map::new(),
            }],
            ..Default::default()
        });

        let result = producer
            .make(CancellationToken::new(), &recipe, dir.path())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.files.len(), 4);
        for name in ["Chart.yaml", "values.yaml", "README.md", "recipe.yaml"] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }
    }

    #[tokio::test]
    async fn readme_omitted_when_include_readme_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let config = ComponentConfig::builder().include_readme(false).build().unwrap();
        let producer = UmbrellaProducer::new(&config);
        let recipe = Recipe::ComponentRef(ComponentRefRecipe {
            component_refs: vec![ComponentRef {
                name: "gpu-operator".into(),
                version: "v25.3.3".into(),
                artifact_type: crate::recipe::component_ref::ArtifactType::Helm,
                source: String::new(),
                values_file: None,
                overrides: Map::new(),
            }],
            ..Default::default()
        });

        let result = producer
            .make(CancellationToken::new(), &recipe, dir.path())
            .await
            .unwrap();
        assert_eq!(result.files.len(), 3);
        assert!(!dir.path().join("README.md").exists());
    }

    #[test]
    fn chart_yaml_dependencies_follow_deployment_order() {
        let config = ComponentConfig::builder().build().unwrap();
        let producer = UmbrellaProducer::new(&config);
        let recipe = two_component_recipe();
        let chart = producer.chart_yaml(&recipe);
        let gpu_pos = chart.find("gpu-operator").unwrap();
        let network_pos = chart.find("network-operator").unwrap();
        assert!(gpu_pos < network_pos);
    }
}
