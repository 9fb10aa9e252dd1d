//! Per-producer tallies and their aggregation into an [`OrchestratorOutput`].

use crate::component::BundleTypeTag;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// A single file a producer wrote, tracked so the orchestrator can total bytes and (later)
/// checksum the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// The result of one producer's [`crate::component::producer::Producer::make`] call.
///
/// Invariant: `total_bytes == sum(size(file) for file in files)`; `success` is true iff `errors`
/// is empty and the producer completed without returning an error.
#[derive(Debug, Clone, Serialize)]
pub struct ProducerResult {
    pub tag: BundleTypeTag,
    pub files: Vec<FileEntry>,
    pub total_bytes: u64,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub success: bool,
    pub errors: Vec<String>,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

impl ProducerResult {
    pub fn new(tag: impl Into<BundleTypeTag>) -> Self {
        Self {
            tag: tag.into(),
            files: Vec::new(),
            total_bytes: 0,
            duration: Duration::ZERO,
            success: false,
            errors: Vec::new(),
        }
    }

    /// Records one written file and keeps `total_bytes` in sync.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, size: u64) {
        self.files.push(FileEntry {
            path: path.into(),
            size,
        });
        self.total_bytes += size;
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Marks the result successful. A producer must call this exactly when all of its writes
    /// are done and it recorded no errors.
    pub fn mark_success(&mut self) {
        self.success = self.errors.is_empty();
    }

    pub fn empty_failure(tag: impl Into<BundleTypeTag>, error: impl Into<String>) -> Self {
        let mut result = Self::new(tag);
        result.add_error(error);
        result
    }
}

/// One producer's error, tagged so the caller can tell which producer failed.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedError {
    pub tag: BundleTypeTag,
    pub error: String,
}

/// The orchestrator's aggregated output (§3). `total_files`/`total_bytes` count only results
/// whose `success == true` (property P1).
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorOutput {
    pub results: Vec<ProducerResult>,
    pub errors: Vec<TaggedError>,
    pub total_files: u64,
    pub total_bytes: u64,
    #[serde(with = "duration_millis")]
    pub total_duration: Duration,
    pub output_dir: PathBuf,
}

impl OrchestratorOutput {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
            total_files: 0,
            total_bytes: 0,
            total_duration: Duration::ZERO,
            output_dir,
        }
    }

    /// Folds one producer's result into the totals, recomputing `total_files`/`total_bytes`
    /// only from successful results (property P1).
    pub fn push_result(&mut self, result: ProducerResult) {
        if result.success {
            self.total_files += result.files.len() as u64;
            self.total_bytes += result.total_bytes;
        } else {
            for message in &result.errors {
                self.errors.push(TaggedError {
                    tag: result.tag.clone(),
                    error: message.clone(),
                });
            }
        }
        self.results.push(result);
    }
}
