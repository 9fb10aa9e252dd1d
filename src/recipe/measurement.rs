//! Measurement-based recipe variant: an ordered sequence of measurements, each a type, a list
//! of subtypes, and a key -> reading map. Produced by the (out-of-scope) recommender from a
//! cluster snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtypes: Vec<String>,
    #[serde(default)]
    pub readings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasurementRecipe {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_measurement_with_readings() {
        let json = r#"{"measurements":[{"type":"gpu","subtypes":["mig"],"readings":{"count":"8"}}]}"#;
        let r: MeasurementRecipe = serde_json::from_str(json).unwrap();
        assert_eq!(r.measurements.len(), 1);
        assert_eq!(r.measurements[0].readings.get("count").unwrap(), "8");
    }
}
