//! The component registry and bundle-producer contract (§4.1, §4.2).

pub mod config;
pub mod producer;
pub mod registry;
pub mod result;

pub use config::{ComponentConfig, Deployer, OutputFormat};
pub use producer::Producer;
pub use registry::{global, FactoryRegistry, InstanceRegistry};
pub use result::{FileEntry, OrchestratorOutput, ProducerResult, TaggedError};

/// An opaque component-kind identifier, e.g. `"gpu-operator"`.
pub type BundleTypeTag = String;
