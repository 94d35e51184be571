//! Embedded development fixtures, used in place of pod hydration when
//! `solid.enabled` is false (§4.5 "Disabled mode", §4.6).

use serde_json::Value;

const PATIENTS: &str = include_str!("../testdata/patients.json");
const OBSERVATIONS: &str = include_str!("../testdata/observations.json");
const QUESTIONNAIRE_RESPONSES: &str = include_str!("../testdata/questionnaire_responses.json");

/// Parses and returns the embedded fixture set for a user-data resource
/// type. Returns an empty vec for any type without a fixture file rather
/// than panicking — dev data is best-effort, not load-bearing.
pub fn load(resource_type: &str) -> Vec<Value> {
    let raw = match resource_type {
        "Patient" => PATIENTS,
        "Observation" => OBSERVATIONS,
        "QuestionnaireResponse" => QUESTIONNAIRE_RESPONSES,
        _ => return Vec::new(),
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::error!(resource_type, error = %e, "embedded test data failed to parse");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_fixtures_parse_and_are_tagged_with_their_type() {
        for resource_type in ["Patient", "Observation", "QuestionnaireResponse"] {
            for resource in load(resource_type) {
                assert_eq!(resource["resourceType"], resource_type);
            }
        }
    }

    #[test]
    fn unknown_type_yields_empty() {
        assert!(load("Medication").is_empty());
    }
}
