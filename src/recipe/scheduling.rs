//! Scheduling hints threaded through to producers: node selectors and tolerations for the
//! non-accelerated and accelerated workloads a recipe deploys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TolerationOperator {
    Equal,
    Exists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TolerationEffect {
    NoSchedule,
    NoExecute,
    PreferNoSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toleration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub operator: TolerationOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub effect: TolerationEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toleration_seconds: Option<i64>,
}

impl Toleration {
    /// Builds a toleration from the `key=value:effect` query-parameter syntax (§4.4).
    /// `operator` defaults to `Equal`; an empty `key` yields `Exists`.
    pub fn from_query_syntax(raw: &str) -> Option<Self> {
        let (kv, effect) = raw.split_once(':')?;
        let effect = match effect {
            "NoSchedule" => TolerationEffect::NoSchedule,
            "NoExecute" => TolerationEffect::NoExecute,
            "PreferNoSchedule" => TolerationEffect::PreferNoSchedule,
            _ => return None,
        };
        let (key, value) = match kv.split_once('=') {
            Some((k, v)) => (k, Some(v.to_string())),
            None => (kv, None),
        };
        let key = if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        };
        let operator = if key.is_none() {
            TolerationOperator::Exists
        } else {
            TolerationOperator::Equal
        };
        Some(Toleration {
            key,
            operator,
            value,
            effect,
            toleration_seconds: None,
        })
    }
}

/// Node selector and toleration pairs for the system (non-accelerated) and accelerated
/// (GPU-bearing) pods a recipe will schedule. Empty maps/slices mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingPolicy {
    #[serde(default)]
    pub system_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub system_tolerations: Vec<Toleration>,
    #[serde(default)]
    pub accelerated_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub accelerated_tolerations: Vec<Toleration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toleration_with_key_and_value() {
        let t = Toleration::from_query_syntax("gpu=true:NoSchedule").unwrap();
        assert_eq!(t.key.as_deref(), Some("gpu"));
        assert_eq!(t.value.as_deref(), Some("true"));
        assert_eq!(t.operator, TolerationOperator::Equal);
        assert_eq!(t.effect, TolerationEffect::NoSchedule);
    }

    #[test]
    fn empty_key_yields_exists() {
        let t = Toleration::from_query_syntax("=:NoExecute").unwrap();
        assert_eq!(t.key, None);
        assert_eq!(t.operator, TolerationOperator::Exists);
    }

    #[test]
    fn rejects_unknown_effect() {
        assert!(Toleration::from_query_syntax("a=b:Bogus").is_none());
    }

    #[test]
    fn rejects_missing_effect() {
        assert!(Toleration::from_query_syntax("a=b").is_none());
    }
}
