//! HTTP router construction (§6).

mod handlers;
mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::auth_middleware, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    let fhir_routes = Router::new()
        .route("/metadata", get(handlers::metadata::capability_statement))
        .route(
            "/:resource_type",
            get(handlers::crud::search).post(handlers::crud::create),
        )
        .route(
            "/:resource_type/:id",
            get(handlers::crud::read)
                .put(handlers::crud::update)
                .delete(handlers::crud::delete),
        )
        .route(
            "/:resource_type/:id/_history/:version",
            get(handlers::crud::read_version),
        )
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/fhir", fhir_routes)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    if state.config.server.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<_> = state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
