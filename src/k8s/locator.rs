//! Output-locator parser (§4.8): `cm://<namespace>/<name>` identifies the configuration object
//! holding the agent's snapshot output.

use crate::error::{Error, Result};

pub const SCHEME: &str = "cm://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub namespace: String,
    pub name: String,
}

/// Parses a `cm://namespace/name` locator. Both segments must be non-empty; any other form is an
/// `InvalidRequest` error (property P8).
pub fn parse(raw: &str) -> Result<Locator> {
    let rest = raw
        .strip_prefix(SCHEME)
        .ok_or_else(|| Error::invalid_request(format!("locator `{raw}` must start with `cm://`")))?;

    let (namespace, name) = rest
        .split_once('/')
        .ok_or_else(|| Error::invalid_request(format!("locator `{raw}` must be `cm://namespace/name`")))?;

    if namespace.is_empty() || name.is_empty() {
        return Err(Error::invalid_request(format!(
            "locator `{raw}` has an empty namespace or name"
        )));
    }
    if name.contains('/') {
        return Err(Error::invalid_request(format!(
            "locator `{raw}` has extra path segments"
        )));
    }

    Ok(Locator {
        namespace: namespace.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// P8 / S8: `cm://a/b` round-trips; everything else is an error.
    #[test]
    fn scenario_s8_locator_parsing() {
        let ok = parse("cm://gpu-operator/snap").unwrap();
        assert_eq!(ok.namespace, "gpu-operator");
        assert_eq!(ok.name, "snap");

        assert!(parse("cm:///name").is_err());
        assert!(parse("configmap://a/b").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn rejects_missing_name_segment() {
        assert!(parse("cm://namespace-only").is_err());
    }

    #[test]
    fn rejects_trailing_path_segments() {
        assert!(parse("cm://ns/name/extra").is_err());
    }
}
