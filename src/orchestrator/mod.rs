//! The bundle orchestrator (§4.3): validates a recipe, selects producers from the registry,
//! runs them in parallel, aggregates their results, and enforces fail-fast semantics.

mod executor;

use crate::checksum;
use crate::component::{BundleTypeTag, ComponentConfig, InstanceRegistry, OrchestratorOutput};
use crate::error::{Error, Result};
use crate::recipe::Recipe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A producer kind the umbrella producer and checksum pass exempt from `selectedTypes`
/// filtering — it always runs when registered (SPEC_FULL.md §2.1).
pub const UMBRELLA_TAG: &str = "umbrella";

#[derive(Clone)]
pub struct OrchestratorConfig {
    /// Empty means "all registered producers".
    pub selected_types: Vec<BundleTypeTag>,
    pub fail_fast: bool,
    pub component_config: ComponentConfig,
    pub registry: Arc<InstanceRegistry>,
}

pub struct BundleOrchestrator {
    config: OrchestratorConfig,
}

impl BundleOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    /// Runs the orchestrator against `recipe`, writing output under `output_dir`.
    ///
    /// Returns `Err` only for validation/setup failures that precede any producer running
    /// (§4.3 steps 1-2); once producers have started, the (possibly partial) output is always
    /// returned alongside an optional fail-fast error, matching the `(Output, error?)` contract.
    pub async fn make(
        &self,
        cancellation: CancellationToken,
        recipe: &Recipe,
        output_dir: &Path,
    ) -> Result<(OrchestratorOutput, Option<Error>)> {
        let start = Instant::now();

        // Step 1: validate input.
        recipe.validate()?;
        self.config.component_config.validate()?;

        // Step 2: normalize outputDir.
        let output_dir = normalize_output_dir(output_dir)?;

        // Step 3: select producers.
        let selected = self.select_producers(recipe);
        if selected.is_empty() {
            return Err(Error::invalid_request("no bundlers selected"));
        }
        info!(count = selected.len(), "selected bundle producers");

        // Step 4: run producers in parallel.
        let results = executor::run(
            self.config.fail_fast,
            cancellation,
            Arc::new(recipe.clone()),
            Arc::new(output_dir.clone()),
            selected,
        )
        .await;

        // Step 5: aggregate.
        let mut output = OrchestratorOutput::new(output_dir.clone());
        for result in results {
            output.push_result(result);
        }

        // Checksum pass: a fixed post-processing step, not itself a selectable producer
        // (SPEC_FULL.md §2.1).
        if self.config.component_config.include_checksums() {
            let paths: Vec<PathBuf> = output
                .results
                .iter()
                .filter(|r| r.success)
                .flat_map(|r| r.files.iter().map(|f| f.path.clone()))
                .collect();
            if !paths.is_empty() {
                match checksum::write_checksums_file(&output_dir, &paths) {
                    Ok(size) => output.total_bytes += size,
                    Err(err) => warn!(error = %err, "failed to write checksums.txt"),
                }
            }
        }

        // Step 6: fail-fast.
        let fail_fast_error = if self.config.fail_fast && !output.errors.is_empty() {
            let first = &output.errors[0];
            Some(Error::internal(format!(
                "producer `{}` failed: {}",
                first.tag, first.error
            )))
        } else {
            None
        };

        // Step 7: stamp.
        output.total_duration = start.elapsed();

        debug!(
            total_files = output.total_files,
            total_bytes = output.total_bytes,
            errors = output.errors.len(),
            "orchestrator run complete"
        );

        Ok((output, fail_fast_error))
    }

    fn select_producers(
        &self,
        recipe: &Recipe,
    ) -> Vec<(BundleTypeTag, Arc<dyn crate::component::Producer>)> {
        let registered = self.config.registry.get_all();

        let mut tags: Vec<BundleTypeTag> = if !self.config.selected_types.is_empty() {
            self.config
                .selected_types
                .iter()
                .filter(|t| registered.contains_key(*t))
                .cloned()
                .collect()
        } else if let Some(component_ref) = recipe.as_component_ref() {
            let names: std::collections::HashSet<String> =
                component_ref.component_names().into_iter().collect();
            registered
                .keys()
                .filter(|tag| names.contains(*tag))
                .cloned()
                .collect()
        } else {
            registered.keys().cloned().collect()
        };

        // The umbrella producer, if registered, always runs (SPEC_FULL.md §2.1) — it is not
        // subject to `selectedTypes` filtering.
        if registered.contains_key(UMBRELLA_TAG) && !tags.iter().any(|t| t.as_str() == UMBRELLA_TAG) {
            tags.push(UMBRELLA_TAG.to_string());
        }

        tags.into_iter()
            .filter_map(|tag| registered.get(&tag).cloned().map(|p| (tag, p)))
            .collect()
    }
}

fn normalize_output_dir(output_dir: &Path) -> Result<PathBuf> {
    let dir = if output_dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        output_dir.to_path_buf()
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::internal(format!("creating output dir {}: {e}", dir.display())))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        let _ = std::fs::set_permissions(&dir, perms);
    }
    Ok(dir)
}
