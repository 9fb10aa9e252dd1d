//! Value overrides: a nested `component-name -> dotted-path -> value` mapping, plus the
//! iterative walk that applies a single dotted path onto an arbitrary YAML mapping (used by
//! producers to fold overrides into their own generated documents).

use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// `component-name -> (dotted path -> value)`. Values are free-form strings; producers decide
/// how to convert them.
pub type OverrideSet = BTreeMap<String, BTreeMap<String, String>>;

/// Parses the `set` query-parameter / `--set` CLI syntax: `componentName:dotted.path=value`.
pub fn parse_set_entry(raw: &str) -> Result<(String, String, String)> {
    let (component, rest) = raw
        .split_once(':')
        .ok_or_else(|| Error::invalid_request(format!("invalid set syntax: `{raw}`")))?;
    let (path, value) = rest
        .split_once('=')
        .ok_or_else(|| Error::invalid_request(format!("invalid set syntax: `{raw}`")))?;
    if component.is_empty() || path.is_empty() {
        return Err(Error::invalid_request(format!(
            "invalid set syntax: `{raw}`"
        )));
    }
    Ok((component.to_string(), path.to_string(), value.to_string()))
}

/// Folds a single `component:path=value` entry into an [`OverrideSet`].
pub fn insert_set_entry(overrides: &mut OverrideSet, raw: &str) -> Result<()> {
    let (component, path, value) = parse_set_entry(raw)?;
    overrides.entry(component).or_default().insert(path, value);
    Ok(())
}

/// Applies a single dotted path (e.g. `driver.version`) onto a mutable YAML mapping, creating
/// intermediate mapping segments as needed. A segment that already exists but is not a mapping
/// is an error (Design Notes §9).
pub fn apply_dotted_path(target: &mut Value, path: &str, value: &str) -> Result<()> {
    if !target.is_mapping() {
        *target = Value::Mapping(Mapping::new());
    }
    let segments: Vec<&str> = path.split('.').collect();
    let mut cursor = target
        .as_mapping_mut()
        .expect("target coerced to mapping above");

    for (i, segment) in segments.iter().enumerate() {
        let key = Value::String(segment.to_string());
        let is_last = i == segments.len() - 1;
        if is_last {
            cursor.insert(key, Value::String(value.to_string()));
            return Ok(());
        }

        let entry = cursor
            .entry(key.clone())
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
        cursor = entry.as_mapping_mut().ok_or_else(|| {
            Error::invalid_request(format!(
                "override path `{path}` crosses a non-map segment `{segment}`"
            ))
        })?;
    }
    Ok(())
}

/// Applies every override registered for `component` onto `target`, in sorted path order so the
/// result is deterministic (reproducibility property P6).
pub fn apply_component_overrides(
    overrides: &OverrideSet,
    component: &str,
    target: &mut Value,
) -> Result<()> {
    let Some(paths) = overrides.get(component) else {
        return Ok(());
    };
    for (path, value) in paths.iter() {
        apply_dotted_path(target, path, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_entry() {
        let (c, p, v) = parse_set_entry("gpu:driver.version=580.82.07").unwrap();
        assert_eq!(c, "gpu");
        assert_eq!(p, "driver.version");
        assert_eq!(v, "580.82.07");
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(parse_set_entry("gpu.driver.version=580").is_err());
    }

    #[test]
    fn rejects_missing_equals() {
        assert!(parse_set_entry("gpu:driver.version").is_err());
    }

    /// S6: two `set` entries for the same component fold into one nested map.
    #[test]
    fn scenario_s6_override_parsing() {
        let mut overrides = OverrideSet::new();
        insert_set_entry(&mut overrides, "gpu:driver.version=580.82.07").unwrap();
        insert_set_entry(&mut overrides, "gpu:mig.strategy=mixed").unwrap();

        let expected: BTreeMap<String, String> = BTreeMap::from([
            ("driver.version".to_string(), "580.82.07".to_string()),
            ("mig.strategy".to_string(), "mixed".to_string()),
        ]);
        assert_eq!(overrides.get("gpu"), Some(&expected));
    }

    #[test]
    fn apply_dotted_path_creates_intermediate_maps() {
        let mut target = Value::Mapping(Mapping::new());
        apply_dotted_path(&mut target, "dcgm.exporter.config.enabled", "true").unwrap();
        let v = &target["dcgm"]["exporter"]["config"]["enabled"];
        assert_eq!(v.as_str(), Some("true"));
    }

    #[test]
    fn apply_dotted_path_errors_on_non_map_segment() {
        let mut target = Value::Mapping(Mapping::new());
        apply_dotted_path(&mut target, "driver.version", "580").unwrap();
        // `driver` is already a mapping; forcing a deeper path through `driver.version` (a
        // scalar) must fail rather than silently overwrite.
        let err = apply_dotted_path(&mut target, "driver.version.patch", "1").unwrap_err();
        assert_eq!(err.kind, crate::error::Kind::InvalidRequest);
    }

    #[test]
    fn apply_component_overrides_is_deterministic() {
        let mut overrides = OverrideSet::new();
        insert_set_entry(&mut overrides, "gpu:b=2").unwrap();
        insert_set_entry(&mut overrides, "gpu:a=1").unwrap();

        let mut target = Value::Mapping(Mapping::new());
        apply_component_overrides(&overrides, "gpu", &mut target).unwrap();
        assert_eq!(target["a"].as_str(), Some("1"));
        assert_eq!(target["b"].as_str(), Some("2"));
    }
}
