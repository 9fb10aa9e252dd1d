//! Explicit startup registration of every built-in producer (§2.1), replacing the reference
//! project's package-init side effects (Design Notes §9) with a function the binary calls once,
//! before the server starts accepting requests.

use crate::component::{ComponentConfig, FactoryRegistry, Producer};
use crate::error::Result;
use crate::producers::{generic::GenericComponentProducer, templates, umbrella};
use crate::producers::umbrella::UmbrellaProducer;
use std::sync::Arc;

/// Every component kind this repository ships a generic template producer for.
pub const BUILTIN_COMPONENT_TAGS: &[&str] = &[
    "gpu-operator",
    "network-operator",
    "cert-manager",
    "node-customization-operator",
    "monitoring-sentinel",
    "dra-driver",
];

/// Registers the umbrella producer and one generic producer per built-in component tag onto
/// `registry`. Idempotent only in the sense that a second call fails with `InvalidRequest` on the
/// first conflicting tag — callers run this exactly once at process startup.
pub fn register_builtin_producers(registry: &FactoryRegistry) -> Result<()> {
    registry.register(
        umbrella::TAG,
        Box::new(|config: &ComponentConfig| {
            Arc::new(UmbrellaProducer::new(config)) as Arc<dyn Producer>
        }),
    )?;

    for tag in BUILTIN_COMPONENT_TAGS {
        let template = templates::lookup(tag).expect("every built-in tag has an embedded template");
        let tag = tag.to_string();
        registry.register(
            tag.clone(),
            Box::new(move |config: &ComponentConfig| {
                Arc::new(GenericComponentProducer::new(tag.clone(), template, config)) as Arc<dyn Producer>
            }),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_umbrella_and_every_builtin_tag() {
        let registry = FactoryRegistry::new();
        register_builtin_producers(&registry).unwrap();
        let types = registry.global_types();
        assert!(types.contains(&umbrella::TAG.to_string()));
        for tag in BUILTIN_COMPONENT_TAGS {
            assert!(types.contains(&tag.to_string()), "missing {tag}");
        }
    }

    #[test]
    fn second_call_on_same_registry_fails() {
        let registry = FactoryRegistry::new();
        register_builtin_producers(&registry).unwrap();
        assert!(register_builtin_producers(&registry).is_err());
    }
}
