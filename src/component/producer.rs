//! The bundle producer contract (§4.2). One implementor per component kind; writes files into a
//! target directory and returns a [`ProducerResult`]. `validate` and `configure` are optional
//! capabilities, modeled as default-`Ok`/no-op methods rather than structural subtyping (Design
//! Notes §9) so the orchestrator can always call them without a capability-probe dance.

use crate::component::{ComponentConfig, ProducerResult};
use crate::error::Result;
use crate::recipe::Recipe;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// A component package's bundle-writing contract.
///
/// Implementations MUST:
/// - write files only under `output_dir`;
/// - track every file written via [`ProducerResult::add_file`];
/// - call [`ProducerResult::mark_success`] exactly when all writes are done;
/// - honor `cancellation` between files, aborting with a cancellation error if it fires;
/// - be safe for concurrent invocations on independent `output_dir`s — the same producer
///   instance is shared across parallel invocations by the orchestrator, so any state the
///   producer caches across calls (e.g. compiled templates) must be synchronized or
///   initialize-once.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Writes this component's files into `output_dir` and returns a tally of what was written.
    /// Must return `Ok` with a non-success result (rather than `Err`) when production fails
    /// partway through, so the orchestrator can still account for partial output.
    async fn make(
        &self,
        cancellation: CancellationToken,
        recipe: &Recipe,
        output_dir: &Path,
    ) -> Result<ProducerResult>;

    /// Optional preflight validation, run before `make`. Default: no-op.
    async fn validate(&self, _cancellation: CancellationToken, _recipe: &Recipe) -> Result<()> {
        Ok(())
    }

    /// Optional reconfiguration after construction, used by tests; the orchestrator never calls
    /// this during parallel execution (Design Notes §9).
    fn configure(&self, _config: &ComponentConfig) -> Result<()> {
        Ok(())
    }
}

/// A factory that builds one producer instance from a [`ComponentConfig`], invoked once per
/// entry in [`crate::component::registry::FactoryRegistry::new_from_global`].
pub type ProducerFactory = Box<dyn Fn(&ComponentConfig) -> std::sync::Arc<dyn Producer> + Send + Sync>;
