//! Command-line surface (SPEC_FULL.md §4.9): a thin consumer of the core, wiring flags onto the
//! same override/scheduling parsing code the HTTP query parser uses (`http::query`) rather than
//! re-implementing it.

use crate::error::Result;
use crate::http::query::{parse_selector_entry, parse_toleration_entry};
use crate::recipe::overrides::insert_set_entry;
use crate::recipe::{OverrideSet, SchedulingPolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gpu-stack-bundler", about = "Bundle orchestrator and cluster agent deployer for the GPU cloud-native stack")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Starts the HTTP bundle endpoint (§4.4).
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Library-mode orchestrator invocation, writing the bundle directly to `--out` (§4.3).
    Bundle(BundleArgs),
    /// Cluster agent lifecycle operations (§4.7).
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
}

#[derive(Args)]
pub struct BundleArgs {
    #[arg(long)]
    pub recipe: PathBuf,
    #[arg(long)]
    pub out: PathBuf,
    /// `componentName:dotted.path=value`, repeatable.
    #[arg(long = "set")]
    pub set: Vec<String>,
    /// Bundle type tag to include, repeatable. Omit to select every registered producer (or, for
    /// a component-ref recipe, the recipe's own component names).
    #[arg(long = "type")]
    pub r#type: Vec<String>,
    #[arg(long, default_value_t = false)]
    pub fail_fast: bool,
    #[arg(long = "system-node-selector")]
    pub system_node_selector: Vec<String>,
    #[arg(long = "system-node-toleration")]
    pub system_node_toleration: Vec<String>,
    #[arg(long = "accelerated-node-selector")]
    pub accelerated_node_selector: Vec<String>,
    #[arg(long = "accelerated-node-toleration")]
    pub accelerated_node_toleration: Vec<String>,
    #[arg(long, default_value = "helm")]
    pub deployer: String,
    #[arg(long)]
    pub repo: Option<String>,
}

#[derive(Subcommand)]
pub enum AgentAction {
    /// Deploy + WaitForCompletion + GetSnapshot, printing the retrieved snapshot YAML to stdout.
    Deploy {
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        config: PathBuf,
    },
    /// Cleanup(enabled=true).
    Cleanup {
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        config: PathBuf,
    },
}

/// Assembles the override set and scheduling policy `bundle` shares with the HTTP endpoint's
/// query-parameter parser, from the flags in `args`.
pub fn bundle_scheduling_and_overrides(args: &BundleArgs) -> Result<(OverrideSet, SchedulingPolicy)> {
    let mut overrides = OverrideSet::new();
    for entry in &args.set {
        insert_set_entry(&mut overrides, entry)?;
    }

    let mut system_selector = std::collections::BTreeMap::new();
    for entry in &args.system_node_selector {
        let (k, v) = parse_selector_entry(entry, "system-node-selector")?;
        system_selector.insert(k, v);
    }
    let mut system_tolerations = Vec::new();
    for entry in &args.system_node_toleration {
        system_tolerations.push(parse_toleration_entry(entry, "system-node-toleration")?);
    }
    let mut accelerated_selector = std::collections::BTreeMap::new();
    for entry in &args.accelerated_node_selector {
        let (k, v) = parse_selector_entry(entry, "accelerated-node-selector")?;
        accelerated_selector.insert(k, v);
    }
    let mut accelerated_tolerations = Vec::new();
    for entry in &args.accelerated_node_toleration {
        accelerated_tolerations.push(parse_toleration_entry(entry, "accelerated-node-toleration")?);
    }

    Ok((
        overrides,
        SchedulingPolicy {
            system_selector,
            system_tolerations,
            accelerated_selector,
            accelerated_tolerations,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_set_flags_into_one_override_set() {
        let args = BundleArgs {
            recipe: PathBuf::from("recipe.yaml"),
            out: PathBuf::from("out"),
            set: vec![
                "gpu:driver.version=580.82.07".to_string(),
                "gpu:mig.strategy=mixed".to_string(),
            ],
            r#type: vec![],
            fail_fast: false,
            system_node_selector: vec![],
            system_node_toleration: vec![],
            accelerated_node_selector: vec![],
            accelerated_node_toleration: vec![],
            deployer: "helm".to_string(),
            repo: None,
        };
        let (overrides, _) = bundle_scheduling_and_overrides(&args).unwrap();
        let gpu = overrides.get("gpu").unwrap();
        assert_eq!(gpu.get("driver.version").unwrap(), "580.82.07");
        assert_eq!(gpu.get("mig.strategy").unwrap(), "mixed");
    }

    #[test]
    fn parses_scheduling_flags() {
        let args = BundleArgs {
            recipe: PathBuf::from("recipe.yaml"),
            out: PathBuf::from("out"),
            set: vec![],
            r#type: vec![],
            fail_fast: false,
            system_node_selector: vec!["disktype=ssd".to_string()],
            system_node_toleration: vec![],
            accelerated_node_selector: vec![],
            accelerated_node_toleration: vec!["gpu=true:NoSchedule".to_string()],
            deployer: "helm".to_string(),
            repo: None,
        };
        let (_, scheduling) = bundle_scheduling_and_overrides(&args).unwrap();
        assert_eq!(scheduling.system_selector.get("disktype").unwrap(), "ssd");
        assert_eq!(scheduling.accelerated_tolerations.len(), 1);
    }
}
