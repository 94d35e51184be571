//! The closed set of resource kinds this gateway understands, and the
//! clone/stamp helpers every provider uses at the API boundary (§4.4, §9).

use chrono::Utc;
use serde_json::Value;

/// User-data resource types: session-scoped, hydrated from and written
/// through to the pod (§4.6).
pub const USER_DATA_RESOURCE_TYPES: &[&str] = &["Patient", "Observation", "QuestionnaireResponse"];

/// Conformance resource types: process-wide static registries, loaded once
/// at startup and never session-scoped (§3, §4.8).
pub const STATIC_RESOURCE_TYPES: &[&str] =
    &["Questionnaire", "StructureDefinition", "ImplementationGuide"];

pub fn is_known_resource_type(resource_type: &str) -> bool {
    USER_DATA_RESOURCE_TYPES.contains(&resource_type) || STATIC_RESOURCE_TYPES.contains(&resource_type)
}

pub fn is_user_data_resource_type(resource_type: &str) -> bool {
    USER_DATA_RESOURCE_TYPES.contains(&resource_type)
}

/// Deep copy at the API boundary. Every value crossing into or out of a
/// provider is cloned so that caller-side mutation can never alias the
/// store (§4.4 "Cloning discipline", §3 invariant 6).
pub fn deep_copy(value: &Value) -> Value {
    value.clone()
}

/// Stamps `id`, `meta.versionId`, and `meta.lastUpdated` onto a resource,
/// overwriting any client-supplied values — the server is the sole
/// authority over identity and version metadata (§4.4).
pub fn stamp_meta(resource: &mut Value, id: &str, version: u32) {
    let Some(obj) = resource.as_object_mut() else {
        return;
    };
    obj.insert("id".to_string(), Value::String(id.to_string()));

    let meta = obj
        .entry("meta".to_string())
        .or_insert_with(|| serde_json::json!({}));
    if let Some(meta_obj) = meta.as_object_mut() {
        meta_obj.insert("versionId".to_string(), Value::String(version.to_string()));
        meta_obj.insert(
            "lastUpdated".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }
}

pub fn resource_type_of(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_resource_types_cover_both_registries() {
        assert!(is_known_resource_type("Patient"));
        assert!(is_known_resource_type("Questionnaire"));
        assert!(!is_known_resource_type("Medication"));
    }

    #[test]
    fn stamp_meta_overwrites_client_supplied_values() {
        let mut resource = json!({
            "resourceType": "Patient",
            "id": "client-supplied",
            "meta": {"versionId": "99", "lastUpdated": "2000-01-01T00:00:00Z"}
        });
        stamp_meta(&mut resource, "1", 1);
        assert_eq!(resource["id"], "1");
        assert_eq!(resource["meta"]["versionId"], "1");
        assert_ne!(resource["meta"]["lastUpdated"], "2000-01-01T00:00:00Z");
    }

    #[test]
    fn deep_copy_does_not_alias() {
        let original = json!({"a": 1});
        let mut copy = deep_copy(&original);
        copy["a"] = json!(2);
        assert_eq!(original["a"], 1);
    }
}
