//! Per-type CRUD and search handlers (§6).

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    auth::RequestContext,
    error::Error,
    resources::{is_user_data_resource_type, STATIC_RESOURCE_TYPES},
    session::Session,
    state::AppState,
};

fn bundle(resources: Vec<Value>) -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "total": resources.len(),
        "entry": resources.into_iter().map(|r| json!({ "resource": r })).collect::<Vec<_>>(),
    })
}

fn location_header(resource_type: &str, id: &str, version: u32) -> HeaderValue {
    HeaderValue::from_str(&format!("/fhir/{resource_type}/{id}/_history/{version}"))
        .unwrap_or_else(|_| HeaderValue::from_static("/fhir"))
}

fn conformance_read_only() -> Error {
    Error::Malformed("this resource type is a read-only conformance registry".to_string())
}

pub async fn read(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    session: Option<Extension<Arc<Session>>>,
) -> Result<Response, Error> {
    if !is_user_data_resource_type(&resource_type) {
        return read_static(&state, &resource_type, &id);
    }

    let Extension(session) = session.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    let provider = provider_for(&state, &resource_type)?;
    let result = provider.read(&session, &id, None)?;
    Ok(Json(result.resource).into_response())
}

pub async fn read_version(
    State(state): State<AppState>,
    Path((resource_type, id, version)): Path<(String, String, u32)>,
    session: Option<Extension<Arc<Session>>>,
) -> Result<Response, Error> {
    if !is_user_data_resource_type(&resource_type) {
        return Err(conformance_read_only());
    }

    let Extension(session) = session.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    let provider = provider_for(&state, &resource_type)?;
    let result = provider.read(&session, &id, Some(version))?;
    Ok(Json(result.resource).into_response())
}

fn read_static(state: &AppState, resource_type: &str, id: &str) -> Result<Response, Error> {
    if !STATIC_RESOURCE_TYPES.contains(&resource_type) {
        return Err(Error::Malformed(format!("unsupported resource type: {resource_type}")));
    }
    state
        .conformance
        .by_id(resource_type, id)
        .map(|r| Json(r).into_response())
        .ok_or_else(|| Error::NotFound {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        })
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    context: Option<Extension<RequestContext>>,
    session: Option<Extension<Arc<Session>>>,
    Json(resource): Json<Value>,
) -> Result<Response, Error> {
    if !is_user_data_resource_type(&resource_type) {
        return Err(conformance_read_only());
    }
    let Extension(context) = context.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    let Extension(session) = session.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    validate_resource_type_matches(&resource, &resource_type)?;

    let provider = provider_for(&state, &resource_type)?;
    let pod_base = state.pod_client.pod_base(&context.subject);
    let (id, version, created) = provider
        .create(&session, pod_base.as_deref(), &context.token, resource)
        .await;

    let mut response = (StatusCode::CREATED, Json(created)).into_response();
    response
        .headers_mut()
        .insert(header::LOCATION, location_header(&resource_type, &id, version));
    Ok(response)
}

pub async fn update(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    context: Option<Extension<RequestContext>>,
    session: Option<Extension<Arc<Session>>>,
    Json(resource): Json<Value>,
) -> Result<Response, Error> {
    if !is_user_data_resource_type(&resource_type) {
        return Err(conformance_read_only());
    }
    let Extension(context) = context.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    let Extension(session) = session.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    validate_resource_type_matches(&resource, &resource_type)?;

    let provider = provider_for(&state, &resource_type)?;
    let pod_base = state.pod_client.pod_base(&context.subject);
    let (version, updated) = provider
        .update(&session, pod_base.as_deref(), &context.token, &id, resource)
        .await;

    let mut response = (StatusCode::OK, Json(updated)).into_response();
    response
        .headers_mut()
        .insert(header::LOCATION, location_header(&resource_type, &id, version));
    Ok(response)
}

pub async fn delete(
    State(state): State<AppState>,
    Path((resource_type, id)): Path<(String, String)>,
    context: Option<Extension<RequestContext>>,
    session: Option<Extension<Arc<Session>>>,
) -> Result<Response, Error> {
    if !is_user_data_resource_type(&resource_type) {
        return Err(conformance_read_only());
    }
    let Extension(context) = context.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    let Extension(session) = session.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;

    let provider = provider_for(&state, &resource_type)?;
    let pod_base = state.pod_client.pod_base(&context.subject);
    provider
        .delete(&session, pod_base.as_deref(), &context.token, &id)
        .await?;

    Ok(StatusCode::OK.into_response())
}

pub async fn search(
    State(state): State<AppState>,
    Path(resource_type): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    session: Option<Extension<Arc<Session>>>,
) -> Result<Response, Error> {
    if !is_user_data_resource_type(&resource_type) {
        return search_static(&state, &resource_type, &query);
    }

    let Extension(session) = session.ok_or_else(|| Error::Unauthenticated("no active session".to_string()))?;
    let provider = provider_for(&state, &resource_type)?;

    let resources = if let Some(id) = query.get("_id") {
        provider.search_by_id(&session, id).resources
    } else {
        provider
            .search_all(&session)
            .resources
            .into_iter()
            .filter(|r| crate::services::matches_search(&resource_type, r, &query))
            .collect()
    };

    Ok(Json(bundle(resources)).into_response())
}

fn search_static(state: &AppState, resource_type: &str, query: &HashMap<String, String>) -> Result<Response, Error> {
    if !STATIC_RESOURCE_TYPES.contains(&resource_type) {
        return Err(Error::Malformed(format!("unsupported resource type: {resource_type}")));
    }

    let resources = state
        .conformance
        .resources_of(resource_type)
        .iter()
        .filter(|r| crate::services::matches_search(resource_type, r, query))
        .cloned()
        .collect();

    Ok(Json(bundle(resources)).into_response())
}

fn provider_for<'a>(state: &'a AppState, resource_type: &str) -> Result<&'a crate::services::ResourceProvider, Error> {
    state
        .providers
        .get(resource_type)
        .ok_or_else(|| Error::Malformed(format!("unsupported resource type: {resource_type}")))
}

fn validate_resource_type_matches(resource: &Value, path_type: &str) -> Result<(), Error> {
    match resource.get("resourceType").and_then(Value::as_str) {
        Some(body_type) if body_type == path_type => Ok(()),
        Some(body_type) => Err(Error::Malformed(format!(
            "body resourceType {body_type} does not match path type {path_type}"
        ))),
        None => Err(Error::Malformed("missing resourceType".to_string())),
    }
}
