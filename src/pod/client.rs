//! LDP-style HTTP client for the user's pod (§4.5).

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::turtle;
use crate::config::SolidConfig;

pub struct PodClient {
    http: Client,
    config: SolidConfig,
}

impl PodClient {
    pub fn new(config: SolidConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()
            .expect("reqwest client configuration is valid");
        Self { http, config }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Derives `scheme://host[:port]` from a WebID of the shape
    /// `https://host[:port]/...#me` (§4.5 "URL derivation").
    pub fn pod_base(&self, webid: &str) -> Option<String> {
        let url = Url::parse(webid).ok()?;
        let host = url.host_str()?;
        let mut base = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            base.push(':');
            base.push_str(&port.to_string());
        }
        Some(base)
    }

    fn container_url(&self, pod_base: &str, resource_type: &str) -> String {
        format!(
            "{}{}/{}/",
            pod_base, self.config.fhir_container_path, resource_type
        )
    }

    /// Every ancestor container that must exist before a per-type container
    /// can be created under it, e.g. `/weare/` and `/weare/fhir/` for a
    /// `fhir_container_path` of `/weare/fhir` (§4.5 "Required containers").
    fn ancestor_container_urls(&self, pod_base: &str) -> Vec<String> {
        let mut urls = Vec::new();
        let mut path = String::new();
        for segment in self.config.fhir_container_path.split('/').filter(|s| !s.is_empty()) {
            path.push_str(segment);
            path.push('/');
            urls.push(format!("{pod_base}/{path}"));
        }
        urls
    }

    fn resource_url(&self, pod_base: &str, resource_type: &str, id: &str) -> String {
        format!(
            "{}{}/{}/{}.ttl",
            pod_base, self.config.fhir_container_path, resource_type, id
        )
    }

    /// Lists every resource currently stored under `resource_type`'s
    /// container. A 404 container means "none yet", not an error.
    pub async fn list(&self, pod_base: &str, resource_type: &str, token: &str) -> Vec<Value> {
        let container_url = self.container_url(pod_base, resource_type);
        let listing = match self
            .http
            .get(&container_url)
            .bearer_auth(token)
            .header("Accept", "text/turtle")
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => return Vec::new(),
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(resource_type, error = %e, "failed reading pod container body");
                    return Vec::new();
                }
            },
            Ok(response) => {
                tracing::warn!(resource_type, status = %response.status(), "pod container listing failed");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(resource_type, error = %e, "pod container request failed");
                return Vec::new();
            }
        };

        let members = match turtle::container_members(&listing) {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(resource_type, error = %e, "failed parsing pod container listing");
                return Vec::new();
            }
        };

        let mut resources = Vec::with_capacity(members.len());
        for member_url in members.iter().filter(|u| u.ends_with(".ttl")) {
            match self.fetch(member_url, token).await {
                Some(resource) => resources.push(resource),
                None => continue,
            }
        }
        resources
    }

    async fn fetch(&self, resource_url: &str, token: &str) -> Option<Value> {
        let response = self
            .http
            .get(resource_url)
            .bearer_auth(token)
            .header("Accept", "text/turtle")
            .send()
            .await
            .map_err(|e| tracing::warn!(resource_url, error = %e, "pod resource fetch failed"))
            .ok()?;

        if !response.status().is_success() {
            tracing::warn!(resource_url, status = %response.status(), "pod resource fetch failed");
            return None;
        }

        let body = response
            .text()
            .await
            .map_err(|e| tracing::warn!(resource_url, error = %e, "pod resource body read failed"))
            .ok()?;

        turtle::from_turtle(&body, resource_url)
            .map_err(|e| tracing::warn!(resource_url, error = %e, "pod resource parse failed"))
            .ok()
    }

    /// Write-through PUT (§4.5). Failures are logged, never propagated —
    /// the in-memory store is already the durable-for-this-session copy.
    pub async fn write(&self, pod_base: &str, resource_type: &str, id: &str, token: &str, resource: &Value) {
        self.ensure_container(pod_base, resource_type, token).await;

        let resource_url = self.resource_url(pod_base, resource_type, id);
        let turtle = match turtle::to_turtle(&resource_url, resource) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(%resource_url, error = %e, "pod serialization failed, aborting write");
                return;
            }
        };

        match self
            .http
            .put(&resource_url)
            .bearer_auth(token)
            .header("Content-Type", "text/turtle")
            .body(turtle)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(%resource_url, status = %response.status(), "pod write failed");
            }
            Err(e) => {
                tracing::warn!(%resource_url, error = %e, "pod write request failed");
            }
        }
    }

    /// Idempotent delete: 2xx or 404 both count as success (§4.5).
    pub async fn delete(&self, pod_base: &str, resource_type: &str, id: &str, token: &str) {
        let resource_url = self.resource_url(pod_base, resource_type, id);
        match self.http.delete(&resource_url).bearer_auth(token).send().await {
            Ok(response)
                if response.status().is_success() || response.status() == StatusCode::NOT_FOUND => {}
            Ok(response) => {
                tracing::warn!(%resource_url, status = %response.status(), "pod delete failed");
            }
            Err(e) => {
                tracing::warn!(%resource_url, error = %e, "pod delete request failed");
            }
        }
    }

    /// Bootstraps the full container chain required for a write under
    /// `resource_type` — the ancestors (`/weare/`, `/weare/fhir/`, ...) and
    /// finally the per-type leaf container, parent before child (§4.5
    /// "Required containers").
    async fn ensure_container(&self, pod_base: &str, resource_type: &str, token: &str) {
        for ancestor_url in self.ancestor_container_urls(pod_base) {
            self.bootstrap_container(&ancestor_url, token).await;
        }
        let container_url = self.container_url(pod_base, resource_type);
        self.bootstrap_container(&container_url, token).await;
    }

    /// HEAD the container; PUT an empty LDP BasicContainer document if
    /// missing.
    async fn bootstrap_container(&self, container_url: &str, token: &str) {
        let exists = self
            .http
            .head(container_url)
            .bearer_auth(token)
            .send()
            .await
            .map(|r| r.status() != StatusCode::NOT_FOUND)
            .unwrap_or(false);
        if exists {
            return;
        }

        if let Err(e) = self
            .http
            .put(container_url)
            .bearer_auth(token)
            .header(
                "Link",
                "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"",
            )
            .body("")
            .send()
            .await
        {
            tracing::warn!(%container_url, error = %e, "pod container bootstrap failed");
        }
    }
}
