//! Pure in-memory search filters over a provider's `searchAll()` set,
//! implementing the parameter families of §4.7.

use serde_json::Value;
use std::collections::HashMap;

/// Conjunctive match of every supplied query parameter against `resource`.
/// Unrecognized parameters for the resource type are ignored rather than
/// rejecting the resource (no filter applied for them).
pub fn matches_search(resource_type: &str, resource: &Value, query: &HashMap<String, String>) -> bool {
    query.iter().all(|(param, value)| match resource_type {
        "Patient" => match_patient(resource, param, value),
        "Observation" => match_observation(resource, param, value),
        "Questionnaire" => match_questionnaire(resource, param, value),
        "QuestionnaireResponse" => match_questionnaire_response(resource, param, value),
        "StructureDefinition" => match_structure_definition(resource, param, value),
        "ImplementationGuide" => match_implementation_guide(resource, param, value),
        _ => true,
    })
}

fn match_patient(resource: &Value, param: &str, value: &str) -> bool {
    match param {
        "identifier" => token_match(resource.get("identifier"), value),
        "name" => string_contains(&full_name(resource), value),
        "family" => string_contains(&family_name(resource), value),
        "given" => string_contains(&given_names(resource), value),
        "birthdate" => date_match(resource.get("birthDate").and_then(Value::as_str), value),
        _ => true,
    }
}

fn match_observation(resource: &Value, param: &str, value: &str) -> bool {
    match param {
        "subject" => reference_match(
            resource.get("subject").and_then(|s| s.get("reference")).and_then(Value::as_str),
            value,
            "Patient",
        ),
        "code" => token_match(resource.get("code").and_then(|c| c.get("coding")), value),
        "date" => date_match(resource.get("effectiveDateTime").and_then(Value::as_str), value),
        "status" => token_match(resource.get("status"), value),
        "category" => token_match(
            resource
                .get("category")
                .and_then(Value::as_array)
                .and_then(|a| a.first())
                .and_then(|c| c.get("coding")),
            value,
        ),
        _ => true,
    }
}

fn match_questionnaire(resource: &Value, param: &str, value: &str) -> bool {
    match param {
        "url" => uri_match(resource.get("url").and_then(Value::as_str), value),
        "identifier" => token_match(resource.get("identifier"), value),
        "name" => string_contains(&resource.get("name").and_then(Value::as_str).map(str::to_string), value),
        "title" => string_contains(&resource.get("title").and_then(Value::as_str).map(str::to_string), value),
        "status" => token_match(resource.get("status"), value),
        "_id" => resource.get("id").and_then(Value::as_str) == Some(value),
        _ => true,
    }
}

fn match_questionnaire_response(resource: &Value, param: &str, value: &str) -> bool {
    match param {
        "subject" => reference_match(
            resource.get("subject").and_then(|s| s.get("reference")).and_then(Value::as_str),
            value,
            "Patient",
        ),
        "questionnaire" => reference_match(
            resource.get("questionnaire").and_then(Value::as_str),
            value,
            "Questionnaire",
        ),
        "status" => token_match(resource.get("status"), value),
        "authored" => date_match(resource.get("authored").and_then(Value::as_str), value),
        "author" => reference_match(
            resource.get("author").and_then(|a| a.get("reference")).and_then(Value::as_str),
            value,
            "Practitioner",
        ),
        _ => true,
    }
}

fn match_structure_definition(resource: &Value, param: &str, value: &str) -> bool {
    match param {
        "url" => uri_match(resource.get("url").and_then(Value::as_str), value),
        "name" => string_contains(&resource.get("name").and_then(Value::as_str).map(str::to_string), value),
        "type" => resource.get("type").and_then(Value::as_str) == Some(value),
        "status" => token_match(resource.get("status"), value),
        "_id" => resource.get("id").and_then(Value::as_str) == Some(value),
        _ => true,
    }
}

fn match_implementation_guide(resource: &Value, param: &str, value: &str) -> bool {
    match param {
        "url" => uri_match(resource.get("url").and_then(Value::as_str), value),
        "name" => string_contains(&resource.get("name").and_then(Value::as_str).map(str::to_string), value),
        "status" => token_match(resource.get("status"), value),
        "_id" => resource.get("id").and_then(Value::as_str) == Some(value),
        _ => true,
    }
}

fn full_name(resource: &Value) -> Option<String> {
    let family = family_name(resource).unwrap_or_default();
    let given = given_names(resource).unwrap_or_default();
    if family.is_empty() && given.is_empty() {
        None
    } else {
        Some(format!("{given} {family}"))
    }
}

fn family_name(resource: &Value) -> Option<String> {
    resource
        .get("name")
        .and_then(Value::as_array)
        .and_then(|names| names.first())
        .and_then(|n| n.get("family"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn given_names(resource: &Value) -> Option<String> {
    resource
        .get("name")
        .and_then(Value::as_array)
        .and_then(|names| names.first())
        .and_then(|n| n.get("given"))
        .and_then(Value::as_array)
        .map(|given| {
            given
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
}

/// Token parameter: `{system?, value}` matched against a coding/identifier
/// array, a single coding object, or a bare string (e.g. a `status` code).
/// A `system|value` query splits on the pipe; a bare query matches on value
/// alone, case-insensitively for status-like enums (single string field),
/// case-sensitively for codes and identifiers (array of coded values).
fn token_match(field: Option<&Value>, query: &str) -> bool {
    let Some(field) = field else { return false };
    let (system, value) = match query.split_once('|') {
        Some((s, v)) => (Some(s), v),
        None => (None, query),
    };

    if let Some(s) = field.as_str() {
        return s.eq_ignore_ascii_case(value);
    }

    let candidates: Vec<&Value> = match field {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![field],
        _ => return false,
    };

    candidates.iter().any(|candidate| {
        let candidate_value = candidate
            .get("value")
            .or_else(|| candidate.get("code"))
            .and_then(Value::as_str);
        let candidate_system = candidate.get("system").and_then(Value::as_str);

        let value_matches = candidate_value == Some(value);
        let system_matches = match system {
            Some(s) => candidate_system == Some(s),
            None => true,
        };
        value_matches && system_matches
    })
}

fn string_contains(field: &Option<String>, query: &str) -> bool {
    match field {
        Some(field) => field.to_lowercase().contains(&query.to_lowercase()),
        None => false,
    }
}

/// Tolerant to `Type/id` and bare `id`; a bare query also matches against
/// the conventional default subject type `Patient` (§4.7).
fn reference_match(stored: Option<&str>, query: &str, default_type: &str) -> bool {
    let Some(stored) = stored else { return false };
    if stored == query {
        return true;
    }
    if stored.ends_with(&format!("/{query}")) {
        return true;
    }
    stored == format!("{default_type}/{query}")
}

/// Missing timestamp never matches (§4.7); otherwise a prefix match against
/// the query, which covers exact date/day/partial-timestamp queries without
/// needing a full FHIR date-range comparator grammar.
fn date_match(stored: Option<&str>, query: &str) -> bool {
    match stored {
        Some(stored) => stored.starts_with(query),
        None => false,
    }
}

fn uri_match(stored: Option<&str>, query: &str) -> bool {
    stored == Some(query)
}
