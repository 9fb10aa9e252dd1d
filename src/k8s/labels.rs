//! Label constants and the pod selector used to find the agent's single running pod (§6).

use std::collections::BTreeMap;

pub const APP_NAME_LABEL: &str = "app.kubernetes.io/name";
pub const PRODUCT_NAME: &str = "gpu-stack-agent";

/// Labels stamped onto every access resource and the workload itself, so they can be found by
/// `APP_NAME_LABEL=PRODUCT_NAME` even without knowing the workload name in advance.
pub fn standard_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(APP_NAME_LABEL.to_string(), PRODUCT_NAME.to_string())])
}

/// The selector string used to list the agent's pod(s): `app.kubernetes.io/name=gpu-stack-agent`.
pub fn pod_label_selector() -> String {
    format!("{APP_NAME_LABEL}={PRODUCT_NAME}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_standard_labels() {
        let labels = standard_labels();
        let selector = pod_label_selector();
        let (key, value) = selector.split_once('=').unwrap();
        assert_eq!(labels.get(key).map(String::as_str), Some(value));
    }
}
