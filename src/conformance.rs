//! Process-wide, read-only static resource registries and the capability
//! document served at `GET /fhir/metadata` (§3 "Static resource registries",
//! §4.8, §6).

use serde_json::{json, Value};
use std::sync::OnceLock;

const QUESTIONNAIRES: &str = include_str!("../testdata/questionnaires.json");
const STRUCTURE_DEFINITIONS: &str = include_str!("../testdata/structure_definitions.json");
const IMPLEMENTATION_GUIDES: &str = include_str!("../testdata/implementation_guides.json");

/// Supported resource type → its declared search parameters (§6).
const SEARCH_PARAMETERS: &[(&str, &[&str])] = &[
    ("Patient", &["identifier", "name", "family", "given", "birthdate"]),
    ("Observation", &["subject", "code", "date", "status", "category"]),
    ("Questionnaire", &["url", "identifier", "name", "title", "status", "_id"]),
    (
        "QuestionnaireResponse",
        &["subject", "questionnaire", "status", "authored", "author"],
    ),
    ("StructureDefinition", &["url", "name", "type", "status", "_id"]),
    ("ImplementationGuide", &["url", "name", "status", "_id"]),
];

/// Loaded once at startup; never mutated after (§3 invariant 8).
pub struct ConformanceRegistry {
    questionnaires: Vec<Value>,
    structure_definitions: Vec<Value>,
    implementation_guides: Vec<Value>,
    capability_statement: OnceLock<Value>,
}

impl ConformanceRegistry {
    pub fn load() -> Self {
        Self {
            questionnaires: parse_fixture(QUESTIONNAIRES, "Questionnaire"),
            structure_definitions: parse_fixture(STRUCTURE_DEFINITIONS, "StructureDefinition"),
            implementation_guides: parse_fixture(IMPLEMENTATION_GUIDES, "ImplementationGuide"),
            capability_statement: OnceLock::new(),
        }
    }

    pub fn resources_of(&self, resource_type: &str) -> &[Value] {
        match resource_type {
            "Questionnaire" => &self.questionnaires,
            "StructureDefinition" => &self.structure_definitions,
            "ImplementationGuide" => &self.implementation_guides,
            _ => &[],
        }
    }

    pub fn by_id(&self, resource_type: &str, id: &str) -> Option<Value> {
        self.resources_of(resource_type)
            .iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .cloned()
    }

    /// Builds (once, lazily) the minimal `CapabilityStatement` document for
    /// `GET /fhir/metadata` (§4.8, §6).
    pub fn capability_statement(&self) -> &Value {
        self.capability_statement.get_or_init(|| {
            let resources: Vec<Value> = SEARCH_PARAMETERS
                .iter()
                .map(|(resource_type, params)| {
                    json!({
                        "type": resource_type,
                        "interaction": [
                            { "code": "read" },
                            { "code": "create" },
                            { "code": "update" },
                            { "code": "delete" },
                            { "code": "search-type" },
                        ],
                        "searchParam": params
                            .iter()
                            .map(|p| json!({ "name": p }))
                            .collect::<Vec<_>>(),
                    })
                })
                .collect();

            json!({
                "resourceType": "CapabilityStatement",
                "status": "active",
                "kind": "instance",
                "fhirVersion": "4.0.1",
                "format": ["json", "text/turtle"],
                "rest": [
                    {
                        "mode": "server",
                        "resource": resources,
                    }
                ],
            })
        })
    }
}

fn parse_fixture(raw: &str, resource_type: &str) -> Vec<Value> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::error!(resource_type, error = %e, "static registry fixture failed to parse");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_load_and_are_tagged_with_their_type() {
        let registry = ConformanceRegistry::load();
        for resource_type in ["Questionnaire", "StructureDefinition", "ImplementationGuide"] {
            for resource in registry.resources_of(resource_type) {
                assert_eq!(resource["resourceType"], resource_type);
            }
        }
    }

    #[test]
    fn capability_statement_lists_all_six_types() {
        let registry = ConformanceRegistry::load();
        let statement = registry.capability_statement();
        let resources = statement["rest"][0]["resource"].as_array().unwrap();
        assert_eq!(resources.len(), 6);
    }

    #[test]
    fn by_id_finds_known_and_rejects_unknown() {
        let registry = ConformanceRegistry::load();
        assert!(registry.by_id("Questionnaire", "intake-1").is_some());
        assert!(registry.by_id("Questionnaire", "nonexistent").is_none());
    }
}
