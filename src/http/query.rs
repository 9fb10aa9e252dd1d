//! Query-parameter parsing for the bundle endpoint (§4.4). Parsed once, before body processing,
//! using the same override/toleration syntax the CLI's `--set`/`--*-toleration` flags share
//! (SPEC_FULL.md §4.9).

use crate::error::{Error, Result};
use crate::recipe::{scheduling::Toleration, OverrideSet, SchedulingPolicy};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundleRequestParams {
    pub overrides: OverrideSet,
    pub scheduling: SchedulingPolicy,
    pub deployer: String,
    pub repo_url: String,
}

/// Shared with the CLI's `--system-node-selector`/`--accelerated-node-selector` flags
/// (SPEC_FULL.md §4.9).
pub(crate) fn parse_selector_entry(raw: &str, param: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| Error::invalid_request(format!("invalid `{param}` syntax: `{raw}`")))
}

/// Shared with the CLI's `--*-toleration` flags (SPEC_FULL.md §4.9).
pub(crate) fn parse_toleration_entry(raw: &str, param: &str) -> Result<Toleration> {
    Toleration::from_query_syntax(raw)
        .ok_or_else(|| Error::invalid_request(format!("invalid `{param}` syntax: `{raw}`")))
}

/// Parses a raw `a=b&c=d` query string, honoring repeated keys, into [`BundleRequestParams`].
pub fn parse_query(raw_query: &str) -> Result<BundleRequestParams> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw_query)
        .map_err(|e| Error::invalid_request(format!("malformed query string: {e}")))?;

    let mut overrides = OverrideSet::new();
    let mut system_selector = BTreeMap::new();
    let mut system_tolerations = Vec::new();
    let mut accelerated_selector = BTreeMap::new();
    let mut accelerated_tolerations = Vec::new();
    let mut deployer = "helm".to_string();
    let mut repo_url = String::new();

    for (key, value) in pairs {
        match key.as_str() {
            "set" => crate::recipe::overrides::insert_set_entry(&mut overrides, &value)?,
            "system-node-selector" => {
                let (k, v) = parse_selector_entry(&value, "system-node-selector")?;
                system_selector.insert(k, v);
            }
            "system-node-toleration" => {
                system_tolerations.push(parse_toleration_entry(&value, "system-node-toleration")?);
            }
            "accelerated-node-selector" => {
                let (k, v) = parse_selector_entry(&value, "accelerated-node-selector")?;
                accelerated_selector.insert(k, v);
            }
            "accelerated-node-toleration" => {
                accelerated_tolerations.push(parse_toleration_entry(&value, "accelerated-node-toleration")?);
            }
            "deployer" => {
                if value != "helm" && value != "argocd" {
                    return Err(Error::invalid_request(format!(
                        "invalid `deployer` value: `{value}`"
                    )));
                }
                deployer = value;
            }
            "repo" => repo_url = value,
            _ => {} // unrecognized parameters are ignored rather than rejected
        }
    }

    if deployer == "argocd" && repo_url.is_empty() {
        return Err(Error::invalid_request(
            "`repo` is required when `deployer=argocd`",
        ));
    }

    Ok(BundleRequestParams {
        overrides,
        scheduling: SchedulingPolicy {
            system_selector,
            system_tolerations,
            accelerated_selector,
            accelerated_tolerations,
        },
        deployer,
        repo_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S6: two `set` entries for the same component fold into one nested map.
    #[test]
    fn scenario_s6_override_query_parsing() {
        let params =
            parse_query("set=gpu:driver.version=580.82.07&set=gpu:mig.strategy=mixed").unwrap();
        let gpu = params.overrides.get("gpu").unwrap();
        assert_eq!(gpu.get("driver.version").unwrap(), "580.82.07");
        assert_eq!(gpu.get("mig.strategy").unwrap(), "mixed");
    }

    #[test]
    fn parses_node_selectors_and_tolerations() {
        let params = parse_query(
            "system-node-selector=disktype=ssd&accelerated-node-toleration=gpu=true:NoSchedule",
        )
        .unwrap();
        assert_eq!(
            params.scheduling.system_selector.get("disktype").unwrap(),
            "ssd"
        );
        assert_eq!(params.scheduling.accelerated_tolerations.len(), 1);
    }

    #[test]
    fn argocd_without_repo_is_invalid() {
        assert!(parse_query("deployer=argocd").is_err());
    }

    #[test]
    fn argocd_with_repo_is_valid() {
        let params = parse_query("deployer=argocd&repo=https://git.example/repo").unwrap();
        assert_eq!(params.deployer, "argocd");
        assert_eq!(params.repo_url, "https://git.example/repo");
    }

    #[test]
    fn invalid_set_syntax_is_rejected() {
        assert!(parse_query("set=not-a-valid-entry").is_err());
    }

    #[test]
    fn invalid_deployer_value_is_rejected() {
        assert!(parse_query("deployer=bogus").is_err());
    }
}
