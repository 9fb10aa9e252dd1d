//! Two-layer component registry (§4.1): a process-wide factory registry populated once at
//! startup, and per-request instance registries materialized from it with a given
//! [`ComponentConfig`].
//!
//! Both layers use a reader/writer lock: readers (the common case — `get`, `list`, snapshotting
//! `get_all`) proceed in parallel, writers are mutually exclusive with everything else.

use crate::component::producer::ProducerFactory;
use crate::component::{BundleTypeTag, ComponentConfig, Producer};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// The process-wide tag -> factory map. Component packages populate this during an explicit
/// registration phase at program startup (Design Notes §9 — not package-init side effects).
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<BundleTypeTag, ProducerFactory>>,
}

static GLOBAL: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the process-wide factory registry, creating it on first access.
pub fn global() -> &'static FactoryRegistry {
    GLOBAL.get_or_init(FactoryRegistry::default)
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `tag`. Fails if `tag` is already present (uniqueness
    /// invariant in §3).
    pub fn register(&self, tag: impl Into<BundleTypeTag>, factory: ProducerFactory) -> Result<()> {
        let tag = tag.into();
        let mut factories = self.factories.write().expect("factory registry poisoned");
        if factories.contains_key(&tag) {
            return Err(Error::invalid_request(format!(
                "bundle type `{tag}` is already registered"
            )));
        }
        factories.insert(tag, factory);
        Ok(())
    }

    /// Like [`Self::register`], but aborts the process on a tag conflict. Intended for
    /// init-time wiring where a conflict indicates a programming error, not a runtime condition
    /// callers should recover from.
    pub fn must_register(&self, tag: impl Into<BundleTypeTag>, factory: ProducerFactory) {
        let tag = tag.into();
        if let Err(err) = self.register(tag.clone(), factory) {
            eprintln!("fatal: {err}");
            std::process::exit(1);
        }
    }

    /// A snapshot of every registered tag.
    pub fn global_types(&self) -> Vec<BundleTypeTag> {
        self.factories
            .read()
            .expect("factory registry poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Invokes every registered factory once with `config`, producing a per-request
    /// [`InstanceRegistry`].
    pub fn new_from_global(&self, config: &ComponentConfig) -> InstanceRegistry {
        let instances = InstanceRegistry::new();
        let factories = self.factories.read().expect("factory registry poisoned");
        for (tag, factory) in factories.iter() {
            instances.register(tag.clone(), factory(config));
        }
        instances
    }
}

/// A per-request tag -> producer-instance map, safe for concurrent readers.
#[derive(Default)]
pub struct InstanceRegistry {
    instances: RwLock<HashMap<BundleTypeTag, Arc<dyn Producer>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-write-wins replace.
    pub fn register(&self, tag: impl Into<BundleTypeTag>, instance: Arc<dyn Producer>) {
        self.instances
            .write()
            .expect("instance registry poisoned")
            .insert(tag.into(), instance);
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn Producer>> {
        self.instances
            .read()
            .expect("instance registry poisoned")
            .get(tag)
            .cloned()
    }

    /// An independent snapshot: later mutation of the registry is not visible through the
    /// returned map (property P3).
    pub fn get_all(&self) -> HashMap<BundleTypeTag, Arc<dyn Producer>> {
        self.instances
            .read()
            .expect("instance registry poisoned")
            .clone()
    }

    pub fn list(&self) -> Vec<BundleTypeTag> {
        self.instances
            .read()
            .expect("instance registry poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.instances.read().expect("instance registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn unregister(&self, tag: &str) -> Result<()> {
        let mut instances = self.instances.write().expect("instance registry poisoned");
        if instances.remove(tag).is_none() {
            return Err(Error::not_found(format!(
                "bundle type `{tag}` is not registered"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ProducerResult;
    use crate::recipe::Recipe;
    use async_trait::async_trait;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    struct NoopProducer;

    #[async_trait]
    impl Producer for NoopProducer {
        async fn make(
            &self,
            _cancellation: CancellationToken,
            _recipe: &Recipe,
            _output_dir: &Path,
        ) -> Result<ProducerResult> {
            let mut result = ProducerResult::new("noop");
            result.mark_success();
            Ok(result)
        }
    }

    fn factory() -> ProducerFactory {
        Box::new(|_config| Arc::new(NoopProducer))
    }

    #[test]
    fn register_rejects_duplicate_tag() {
        let registry = FactoryRegistry::new();
        registry.register("gpu-operator", factory()).unwrap();
        let err = registry.register("gpu-operator", factory()).unwrap_err();
        assert_eq!(err.kind, crate::error::Kind::InvalidRequest);
    }

    #[test]
    fn new_from_global_invokes_every_factory_once() {
        let registry = FactoryRegistry::new();
        registry.register("gpu-operator", factory()).unwrap();
        registry.register("network-operator", factory()).unwrap();

        let config = ComponentConfig::builder().build().unwrap();
        let instances = registry.new_from_global(&config);

        assert_eq!(instances.count(), 2);
        assert!(instances.get("gpu-operator").is_some());
    }

    #[test]
    fn unregister_missing_tag_errors() {
        let instances = InstanceRegistry::new();
        assert!(instances.unregister("missing").is_err());
    }

    /// P3: mutating a map returned by `get_all` must not affect subsequent `count`/`list`/`get`.
    #[test]
    fn property_p3_get_all_is_an_independent_snapshot() {
        let instances = InstanceRegistry::new();
        instances.register("gpu-operator", Arc::new(NoopProducer));

        let mut snapshot = instances.get_all();
        snapshot.insert("network-operator".to_string(), Arc::new(NoopProducer));
        snapshot.remove("gpu-operator");

        assert_eq!(instances.count(), 1);
        assert_eq!(instances.list(), vec!["gpu-operator".to_string()]);
        assert!(instances.get("gpu-operator").is_some());
    }

    #[test]
    fn global_registry_is_shared_across_calls() {
        // Use a uniquely-named tag so this test does not collide with others sharing the same
        // process-wide registry.
        let tag = "test-only-global-registry-tag";
        global().register(tag, factory()).ok();
        assert!(global().global_types().contains(&tag.to_string()));
    }
}
