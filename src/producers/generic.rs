//! Generic component producer: one instance per named component kind, rendering an embedded
//! template (§2.1) by substituting `${nr-var:path}` placeholders. Grounded in the reference
//! project's own regex-based template substitution, adapted from string-keyed variables to the
//! dotted override paths this spec uses.

use crate::component::{ComponentConfig, Producer, ProducerResult};
use crate::error::Result;
use crate::recipe::{OverrideSet, Recipe, SchedulingPolicy, Toleration};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{nr-var:([A-Za-z0-9_.]+)\}").unwrap())
}

fn selector_flow(selector: &BTreeMap<String, String>) -> String {
    if selector.is_empty() {
        return "{}".to_string();
    }
    let pairs: Vec<String> = selector.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", pairs.join(", "))
}

fn tolerations_flow(tolerations: &[Toleration]) -> String {
    if tolerations.is_empty() {
        return "[]".to_string();
    }
    let items: Vec<String> = tolerations
        .iter()
        .map(|t| {
            format!(
                "{{key: {}, operator: {:?}, effect: {:?}}}",
                t.key.clone().unwrap_or_default(),
                t.operator,
                t.effect
            )
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// Resolves one `${nr-var:path}` placeholder to its substitution text.
fn resolve(path: &str, overrides: &BTreeMap<String, String>, scheduling: &SchedulingPolicy) -> String {
    match path {
        "scheduling.accelerated.selector" => selector_flow(&scheduling.accelerated_selector),
        "scheduling.accelerated.tolerations" => tolerations_flow(&scheduling.accelerated_tolerations),
        "scheduling.system.selector" => selector_flow(&scheduling.system_selector),
        "scheduling.system.tolerations" => tolerations_flow(&scheduling.system_tolerations),
        other => overrides.get(other).cloned().unwrap_or_default(),
    }
}

/// Substitutes every `${nr-var:path}` placeholder in `template`.
pub fn render(template: &str, overrides: &BTreeMap<String, String>, scheduling: &SchedulingPolicy) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            resolve(&caps[1], overrides, scheduling)
        })
        .into_owned()
}

pub struct GenericComponentProducer {
    tag: String,
    template: &'static str,
    overrides: BTreeMap<String, String>,
    scheduling: SchedulingPolicy,
}

impl GenericComponentProducer {
    pub fn new(tag: impl Into<String>, template: &'static str, config: &ComponentConfig) -> Self {
        let tag = tag.into();
        let overrides: OverrideSet = config.value_overrides();
        Self {
            overrides: overrides.get(&tag).cloned().unwrap_or_default(),
            scheduling: config.scheduling_policy(),
            tag,
            template,
        }
    }

    /// Merges the config-baked overrides for this component with any inline overrides carried
    /// on the recipe's own component reference, which take precedence (they are the more
    /// specific, request-scoped source).
    fn merged_overrides(&self, recipe: &Recipe) -> BTreeMap<String, String> {
        let mut merged = self.overrides.clone();
        if let Some(component_ref) = recipe
            .as_component_ref()
            .and_then(|r| r.component_refs.iter().find(|c| c.name == self.tag))
        {
            for (k, v) in &component_ref.overrides {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }
}

#[async_trait]
impl Producer for GenericComponentProducer {
    async fn make(
        &self,
        _cancellation: CancellationToken,
        recipe: &Recipe,
        output_dir: &Path,
    ) -> Result<ProducerResult> {
        let mut result = ProducerResult::new(self.tag.clone());
        let overrides = self.merged_overrides(recipe);
        let rendered = render(self.template, &overrides, &self.scheduling);

        let component_dir = output_dir.join(&self.tag);
        if let Err(e) = std::fs::create_dir_all(&component_dir) {
            result.add_error(format!("creating {}: {e}", component_dir.display()));
            result.mark_success();
            return Ok(result);
        }

        let file_path = component_dir.join("values.yaml");
        if let Err(e) = std::fs::write(&file_path, &rendered) {
            result.add_error(format!("writing {}: {e}", file_path.display()));
            result.mark_success();
            return Ok(result);
        }

        result.add_file(
            Path::new(&self.tag).join("values.yaml"),
            rendered.len() as u64,
        );
        result.mark_success();
        Ok(result)
    }
}
