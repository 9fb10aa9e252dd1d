//! Per-request configuration shared by every producer the orchestrator invokes. Immutable after
//! construction; getters return deep copies so a caller mutating a returned collection cannot
//! observe its mutation back through the config (property P2).

use crate::error::{Error, Result};
use crate::recipe::{OverrideSet, SchedulingPolicy, Toleration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Yaml,
    Json,
    Helm,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Yaml
    }
}

impl OutputFormat {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "yaml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            "helm" => Ok(OutputFormat::Helm),
            other => Err(Error::invalid_request(format!(
                "invalid outputFormat `{other}`: expected yaml, json, or helm"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployer {
    Helm,
    Argocd,
}

impl Default for Deployer {
    fn default() -> Self {
        Deployer::Helm
    }
}

impl Deployer {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "helm" => Ok(Deployer::Helm),
            "argocd" => Ok(Deployer::Argocd),
            other => Err(Error::invalid_request(format!(
                "invalid deployer `{other}`: expected helm or argocd"
            ))),
        }
    }
}

/// Immutable, per-request bundling configuration (§3). Construct through [`ComponentConfigBuilder`]
/// so that invariants (valid `outputFormat`, `repoURL` required for `argocd`) are enforced once,
/// at construction time, rather than scattered across call sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    output_format: OutputFormat,
    compression: bool,
    include_scripts: bool,
    include_readme: bool,
    include_checksums: bool,
    verbose: bool,
    version: String,
    value_overrides: OverrideSet,
    system_selector: BTreeMap<String, String>,
    system_tolerations: Vec<Toleration>,
    accelerated_selector: BTreeMap<String, String>,
    accelerated_tolerations: Vec<Toleration>,
    deployer: Deployer,
    repo_url: String,
}

impl ComponentConfig {
    pub fn builder() -> ComponentConfigBuilder {
        ComponentConfigBuilder::default()
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn include_scripts(&self) -> bool {
        self.include_scripts
    }

    pub fn include_readme(&self) -> bool {
        self.include_readme
    }

    pub fn include_checksums(&self) -> bool {
        self.include_checksums
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn version(&self) -> String {
        self.version.clone()
    }

    /// Deep copy: mutating the returned map never affects `self` (property P2).
    pub fn value_overrides(&self) -> OverrideSet {
        self.value_overrides.clone()
    }

    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy {
            system_selector: self.system_selector.clone(),
            system_tolerations: self.system_tolerations.clone(),
            accelerated_selector: self.accelerated_selector.clone(),
            accelerated_tolerations: self.accelerated_tolerations.clone(),
        }
    }

    pub fn deployer(&self) -> Deployer {
        self.deployer
    }

    pub fn repo_url(&self) -> String {
        self.repo_url.clone()
    }

    /// Validates cross-field invariants not expressible at deserialization time.
    pub fn validate(&self) -> Result<()> {
        if self.deployer == Deployer::Argocd && self.repo_url.is_empty() {
            return Err(Error::invalid_request(
                "repoURL is required when deployer is argocd",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ComponentConfigBuilder {
    output_format: Option<String>,
    compression: bool,
    include_scripts: bool,
    include_readme: bool,
    include_checksums: bool,
    verbose: bool,
    version: Option<String>,
    value_overrides: OverrideSet,
    scheduling: SchedulingPolicy,
    deployer: Option<String>,
    repo_url: String,
    scripts_readme_checksums_set: bool,
}

impl ComponentConfigBuilder {
    pub fn output_format(mut self, v: impl Into<String>) -> Self {
        self.output_format = Some(v.into());
        self
    }

    pub fn compression(mut self, v: bool) -> Self {
        self.compression = v;
        self
    }

    pub fn include_scripts(mut self, v: bool) -> Self {
        self.include_scripts = v;
        self.scripts_readme_checksums_set = true;
        self
    }

    pub fn include_readme(mut self, v: bool) -> Self {
        self.include_readme = v;
        self.scripts_readme_checksums_set = true;
        self
    }

    pub fn include_checksums(mut self, v: bool) -> Self {
        self.include_checksums = v;
        self.scripts_readme_checksums_set = true;
        self
    }

    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }

    pub fn version(mut self, v: impl Into<String>) -> Self {
        self.version = Some(v.into());
        self
    }

    pub fn value_overrides(mut self, v: OverrideSet) -> Self {
        self.value_overrides = v;
        self
    }

    pub fn scheduling_policy(mut self, v: SchedulingPolicy) -> Self {
        self.scheduling = v;
        self
    }

    pub fn deployer(mut self, v: impl Into<String>) -> Self {
        self.deployer = Some(v.into());
        self
    }

    pub fn repo_url(mut self, v: impl Into<String>) -> Self {
        self.repo_url = v.into();
        self
    }

    pub fn build(self) -> Result<ComponentConfig> {
        let output_format = match self.output_format {
            Some(raw) => OutputFormat::parse(&raw)?,
            None => OutputFormat::default(),
        };
        let deployer = match self.deployer {
            Some(raw) => Deployer::parse(&raw)?,
            None => Deployer::default(),
        };
        // include_* default to true unless the builder explicitly set them.
        let (include_scripts, include_readme, include_checksums) =
            if self.scripts_readme_checksums_set {
                (self.include_scripts, self.include_readme, self.include_checksums)
            } else {
                (true, true, true)
            };

        let config = ComponentConfig {
            output_format,
            compression: self.compression,
            include_scripts,
            include_readme,
            include_checksums,
            verbose: self.verbose,
            version: self.version.unwrap_or_else(|| "dev".to_string()),
            value_overrides: self.value_overrides,
            system_selector: self.scheduling.system_selector,
            system_tolerations: self.scheduling.system_tolerations,
            accelerated_selector: self.scheduling.accelerated_selector,
            accelerated_tolerations: self.scheduling.accelerated_tolerations,
            deployer,
            repo_url: self.repo_url,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = ComponentConfig::builder().build().unwrap();
        assert_eq!(config.output_format(), OutputFormat::Yaml);
        assert!(!config.compression());
        assert!(config.include_scripts());
        assert!(config.include_readme());
        assert!(config.include_checksums());
        assert!(!config.verbose());
        assert_eq!(config.version(), "dev");
        assert_eq!(config.deployer(), Deployer::Helm);
        assert_eq!(config.repo_url(), "");
    }

    #[test]
    fn rejects_invalid_output_format() {
        let err = ComponentConfig::builder()
            .output_format("xml")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, crate::error::Kind::InvalidRequest);
    }

    #[test]
    fn argocd_requires_repo_url() {
        let err = ComponentConfig::builder()
            .deployer("argocd")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, crate::error::Kind::InvalidRequest);

        let ok = ComponentConfig::builder()
            .deployer("argocd")
            .repo_url("https://git.example/repo")
            .build();
        assert!(ok.is_ok());
    }

    /// P2: mutating a map returned by a getter must not affect the config.
    #[test]
    fn property_p2_getters_return_deep_copies() {
        let mut overrides = OverrideSet::new();
        overrides
            .entry("gpu".to_string())
            .or_default()
            .insert("driver.version".to_string(), "580".to_string());

        let config = ComponentConfig::builder()
            .value_overrides(overrides)
            .build()
            .unwrap();

        let mut copy = config.value_overrides();
        copy.insert("network-operator".to_string(), BTreeMap::new());

        assert_eq!(config.value_overrides().len(), 1);
        assert!(!config.value_overrides().contains_key("network-operator"));
    }
}
