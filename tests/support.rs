//! In-process axum router test harness, using `tower::ServiceExt::oneshot`
//! instead of a real TCP listener (§8).

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use gateway::{api::create_router, config::Config, state::AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    router: axum::Router,
}

impl TestApp {
    /// Builds a router over a fresh `AppState` with pod integration
    /// disabled, as §8 explicitly allows for the test harness.
    pub fn new() -> Self {
        let mut config = Config::default();
        config.solid.enabled = false;
        let state = AppState::new(config);
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = bearer {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/fhir+json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, path: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, bearer, None).await
    }

    pub async fn post(&self, path: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, bearer, Some(body)).await
    }

    pub async fn put(&self, path: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, bearer, Some(body)).await
    }

    pub async fn delete(&self, path: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, bearer, None).await
    }
}

/// Builds an unsigned structural JWT with the given claims (§4.3). The
/// signature segment is always empty — this gateway never checks it.
pub fn bearer_token(jti: &str, sub: &str, exp: Option<i64>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let mut claims = serde_json::json!({ "jti": jti, "sub": sub });
    if let Some(exp) = exp {
        claims["exp"] = serde_json::json!(exp);
    }
    let claims = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{claims}.")
}
