//! Shared application state (§3, §4).

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::Config, conformance::ConformanceRegistry, pod::PodClient,
    resources::USER_DATA_RESOURCE_TYPES, services::ResourceProvider, session::SessionStore,
};

/// Cloned into every request; everything behind an `Arc` so the clone is
/// cheap and all handlers observe the same underlying stores.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session_store: Arc<SessionStore>,
    pub pod_client: Arc<PodClient>,
    pub conformance: Arc<ConformanceRegistry>,
    /// One [`ResourceProvider`] per user-data resource type (§4.4).
    pub providers: Arc<HashMap<&'static str, ResourceProvider>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let pod_client = Arc::new(PodClient::new(config.solid.clone()));
        let providers = USER_DATA_RESOURCE_TYPES
            .iter()
            .map(|&resource_type| (resource_type, ResourceProvider::new(resource_type, pod_client.clone())))
            .collect();

        Self {
            session_store: Arc::new(SessionStore::new()),
            conformance: Arc::new(ConformanceRegistry::load()),
            providers: Arc::new(providers),
            pod_client,
            config,
        }
    }
}
