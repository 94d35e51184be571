//! Error taxonomy for the gateway.
//!
//! Every variant maps to exactly one HTTP status code (§7 of the design
//! spec). Pod-sync failures are deliberately *not* represented here — they
//! are logged at the call site and never propagate to the API caller.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing/malformed bearer, decode failure, or expired token. 401.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// No such id, or an explicit version that was never written. 404.
    #[error("{resource_type}/{id} not found")]
    NotFound { resource_type: String, id: String },

    /// A tombstoned id. 410.
    #[error("{resource_type}/{id} is gone")]
    Gone {
        resource_type: String,
        id: String,
        version_id: Option<u32>,
    },

    /// Unparseable body or resource-type mismatch. 400.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// Anything else, including a Turtle serializer round-trip failure. 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Gone { .. } => StatusCode::GONE,
            Error::Malformed(_) => StatusCode::BAD_REQUEST,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn issue_code(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) => "login",
            Error::NotFound { .. } => "not-found",
            Error::Gone { .. } => "deleted",
            Error::Malformed(_) => "invalid",
            Error::Internal(_) => "exception",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let diagnostics = self.to_string();
        let body = Json(json!({
            "resourceType": "OperationOutcome",
            "issue": [{
                "severity": "error",
                "code": self.issue_code(),
                "diagnostics": diagnostics,
            }]
        }));

        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/fhir+json; charset=utf-8"),
        );
        if matches!(self, Error::Unauthenticated(_)) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
