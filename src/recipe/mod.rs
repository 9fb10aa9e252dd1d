//! The recipe is the polymorphic input to the orchestrator: either a measurement-based recipe
//! (produced by the out-of-scope recommender from a cluster snapshot) or a component-ref-based
//! recipe (the shape accepted by the HTTP bundle endpoint). Modeled as a tagged sum per Design
//! Notes §9, rather than structural subtyping.

pub mod component_ref;
pub mod measurement;
pub mod overrides;
pub mod scheduling;

pub use component_ref::{ComponentRef, ComponentRefRecipe, Criteria};
pub use measurement::{Measurement, MeasurementRecipe};
pub use overrides::OverrideSet;
pub use scheduling::{SchedulingPolicy, Toleration, TolerationEffect, TolerationOperator};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipe {
    ComponentRef(ComponentRefRecipe),
    Measurement(MeasurementRecipe),
}

impl Recipe {
    /// Validity invariants from §3: non-empty measurements / component refs, and (for
    /// component-ref recipes) `deploymentOrder`, if present, must be a permutation of the
    /// component names.
    pub fn validate(&self) -> Result<()> {
        match self {
            Recipe::ComponentRef(r) => {
                if r.component_refs.is_empty() {
                    return Err(Error::invalid_request(
                        "recipe has no component refs: at least one component is required",
                    ));
                }
                if let Some(order) = &r.deployment_order {
                    let mut names = r.component_names();
                    let mut ordered = order.clone();
                    names.sort();
                    ordered.sort();
                    if names != ordered {
                        return Err(Error::invalid_request(
                            "deploymentOrder must be a permutation of the component names",
                        ));
                    }
                }
                Ok(())
            }
            Recipe::Measurement(r) => {
                if r.measurements.is_empty() {
                    return Err(Error::invalid_request(
                        "recipe has no measurements: at least one measurement is required",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Component-name projection; only meaningful for component-ref-based recipes (Design Notes
    /// §9 — the orchestrator switches on variant only when it needs this projection).
    pub fn component_names(&self) -> Vec<String> {
        match self {
            Recipe::ComponentRef(r) => r.component_names(),
            Recipe::Measurement(_) => Vec::new(),
        }
    }

    pub fn as_component_ref(&self) -> Option<&ComponentRefRecipe> {
        match self {
            Recipe::ComponentRef(r) => Some(r),
            Recipe::Measurement(_) => None,
        }
    }
}
