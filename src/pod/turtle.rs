//! Conversion between the JSON resource shape and RDF/Turtle for pod
//! transport (§4.5). A minimal, lossless-for-this-domain mapping: every
//! top-level JSON field becomes a predicate under a gateway-private
//! namespace, values are literals, and `resourceType` becomes an `rdf:type`
//! triple. This is not a FHIR-to-RDF ontology mapping — it is exactly
//! expressive enough to round-trip what this gateway itself writes.

use oxrdf::{vocab::rdf, Graph, Literal, NamedNode, NamedNodeRef, Triple};
use oxttl::{TurtleParser, TurtleSerializer};
use serde_json::Value;
use std::io::Cursor;

use crate::error::Error;

const NS: &str = "urn:fhir-session-gateway:field:";
const FHIR_NS: &str = "urn:fhir-session-gateway:type:";

/// Serializes `resource` to Turtle, then immediately parses the output back
/// as RDF as a self-check (§4.5: "a parse failure indicates a serialization
/// bug and raises a hard error rather than corrupting the pod").
pub fn to_turtle(subject_url: &str, resource: &Value) -> Result<String, Error> {
    let subject = NamedNode::new(subject_url)
        .map_err(|e| Error::Internal(format!("invalid pod subject URL: {e}")))?;

    let mut graph = Graph::new();
    if let Some(resource_type) = resource.get("resourceType").and_then(Value::as_str) {
        let type_node = NamedNode::new(format!("{FHIR_NS}{resource_type}"))
            .map_err(|e| Error::Internal(format!("invalid resource type IRI: {e}")))?;
        graph.insert(&Triple::new(subject.clone(), rdf::TYPE, type_node));
    }

    if let Some(object) = resource.as_object() {
        for (key, value) in object {
            if key == "resourceType" {
                continue;
            }
            let predicate = NamedNode::new(format!("{NS}{key}"))
                .map_err(|e| Error::Internal(format!("invalid predicate IRI: {e}")))?;
            let literal = Literal::new_simple_literal(value.to_string());
            graph.insert(&Triple::new(subject.clone(), predicate, literal));
        }
    }

    let mut output = Vec::new();
    let mut serializer = TurtleSerializer::new().for_writer(&mut output);
    for triple in &graph {
        serializer
            .serialize_triple(triple)
            .map_err(|e| Error::Internal(format!("turtle serialization failed: {e}")))?;
    }
    serializer
        .finish()
        .map_err(|e| Error::Internal(format!("turtle serialization failed: {e}")))?;
    let turtle = String::from_utf8(output)
        .map_err(|e| Error::Internal(format!("turtle output was not valid utf-8: {e}")))?;

    // Self-check: a gateway that writes unparseable Turtle has a bug, not a
    // transient failure, so this is a hard error rather than a logged one.
    parse_turtle(&turtle, subject_url)?;

    Ok(turtle)
}

/// Parses a Turtle document and reconstructs the JSON resource shape that
/// [`to_turtle`] would have produced for `subject_url`.
pub fn from_turtle(turtle: &str, subject_url: &str) -> Result<Value, Error> {
    let graph = parse_turtle(turtle, subject_url)?;
    let subject = NamedNodeRef::new(subject_url)
        .map_err(|e| Error::Internal(format!("invalid pod subject URL: {e}")))?;

    let mut object = serde_json::Map::new();
    for triple in graph.triples_for_subject(subject) {
        if triple.predicate == rdf::TYPE {
            if let oxrdf::TermRef::NamedNode(type_node) = triple.object {
                if let Some(resource_type) = type_node.as_str().strip_prefix(FHIR_NS) {
                    object.insert(
                        "resourceType".to_string(),
                        Value::String(resource_type.to_string()),
                    );
                }
            }
            continue;
        }
        if let Some(field) = triple.predicate.as_str().strip_prefix(NS) {
            if let oxrdf::TermRef::Literal(literal) = triple.object {
                let parsed: Value = serde_json::from_str(literal.value())
                    .unwrap_or_else(|_| Value::String(literal.value().to_string()));
                object.insert(field.to_string(), parsed);
            }
        }
    }

    Ok(Value::Object(object))
}

fn parse_turtle(turtle: &str, _subject_url: &str) -> Result<Graph, Error> {
    let mut graph = Graph::new();
    let parser = TurtleParser::new().for_reader(Cursor::new(turtle.as_bytes()));
    for triple in parser {
        let triple = triple.map_err(|e| Error::Internal(format!("turtle parse failed: {e}")))?;
        graph.insert(&triple);
    }
    Ok(graph)
}

/// Extracts every object URI of `ldp:contains` triples in a container
/// listing document (§4.5 "List + fetch").
pub fn container_members(turtle: &str) -> Result<Vec<String>, Error> {
    let graph = parse_turtle(turtle, "")?;
    let contains = NamedNodeRef::new("http://www.w3.org/ns/ldp#contains")
        .expect("static IRI is valid");

    Ok(graph
        .iter()
        .filter(|t| t.predicate == contains)
        .filter_map(|t| match t.object {
            oxrdf::TermRef::NamedNode(n) => Some(n.as_str().to_string()),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_a_flat_resource() {
        let resource = json!({
            "resourceType": "Patient",
            "id": "1",
            "name": "Doe"
        });
        let turtle = to_turtle("urn:test:patient:1", &resource).unwrap();
        let back = from_turtle(&turtle, "urn:test:patient:1").unwrap();
        assert_eq!(back["resourceType"], "Patient");
        assert_eq!(back["name"], "Doe");
    }

    #[test]
    fn container_members_extracts_ldp_contains() {
        let turtle = r#"
            @prefix ldp: <http://www.w3.org/ns/ldp#> .
            <urn:test:container> ldp:contains <urn:test:container/1.ttl> .
            <urn:test:container> ldp:contains <urn:test:container/2.ttl> .
        "#;
        let mut members = container_members(turtle).unwrap();
        members.sort();
        assert_eq!(
            members,
            vec![
                "urn:test:container/1.ttl".to_string(),
                "urn:test:container/2.ttl".to_string(),
            ]
        );
    }
}
