mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::{bearer_token, TestApp};

#[tokio::test]
async fn session_isolation_between_distinct_tokens() {
    let app = TestApp::new();
    let token_a = bearer_token("a", "https://pod.example/u1#me", None);
    let token_b = bearer_token("b", "https://pod.example/u2#me", None);

    let (status, _) = app
        .post(
            "/fhir/Patient",
            Some(token_a.as_str()),
            json!({"resourceType": "Patient", "name": [{"family": "Doe"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get("/fhir/Patient", Some(token_b.as_str())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new();
    let expired = bearer_token("x", "https://pod.example/u1#me", Some(0));
    let (status, _) = app.get("/fhir/Patient", Some(expired.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_authorization_on_protected_path_is_unauthenticated() {
    let app = TestApp::new();
    let (status, _) = app.get("/fhir/Patient", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_bearer_payload_is_unauthenticated() {
    let app = TestApp::new();
    let (status, _) = app.request(axum::http::Method::GET, "/fhir/Patient", Some(""), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_endpoint_serves_without_a_bearer() {
    let app = TestApp::new();
    let (status, _) = app.get("/fhir/metadata", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/fhir/Questionnaire", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/fhir/QuestionnaireResponse", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
