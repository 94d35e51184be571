//! One instance per resource type, operating against a single session's
//! resource store (§4.4).

use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::Error,
    resources::{deep_copy, stamp_meta},
    session::Session,
};

/// `created` distinguishes a fresh id (201) from an update-as-create on an
/// id that did not previously exist (§9 open question 3: still a 201-style
/// outcome, the distinction is carried for callers that care).
#[derive(Debug)]
pub struct ReadResult {
    pub resource: Value,
    pub version: u32,
}

pub struct SearchResult {
    pub resources: Vec<Value>,
}

/// Constructed once per supported resource type and shared across sessions;
/// it holds no session state itself — every operation takes the session it
/// should act on as an explicit argument.
pub struct ResourceProvider {
    resource_type: &'static str,
    pod_client: Arc<crate::pod::PodClient>,
}

impl ResourceProvider {
    pub fn new(resource_type: &'static str, pod_client: Arc<crate::pod::PodClient>) -> Self {
        Self {
            resource_type,
            pod_client,
        }
    }

    /// `read(id, version?)` (§4.4). A tombstoned id is Gone regardless of
    /// whether a specific version is requested, unless that version was
    /// never written in the first place — that's still NotFound.
    pub fn read(&self, session: &Session, id: &str, version: Option<u32>) -> Result<ReadResult, Error> {
        let stored = session.get(self.resource_type, id, version);

        if session.is_deleted(self.resource_type, id) {
            if version.is_some() && stored.is_none() {
                return Err(Error::NotFound {
                    resource_type: self.resource_type.to_string(),
                    id: id.to_string(),
                });
            }
            return Err(Error::Gone {
                resource_type: self.resource_type.to_string(),
                id: id.to_string(),
                version_id: session.latest_version_number(self.resource_type, id),
            });
        }

        match stored {
            Some(resource) => {
                let actual_version = version
                    .or_else(|| session.latest_version_number(self.resource_type, id))
                    .unwrap_or(1);
                Ok(ReadResult {
                    resource: deep_copy(&resource),
                    version: actual_version,
                })
            }
            None => Err(Error::NotFound {
                resource_type: self.resource_type.to_string(),
                id: id.to_string(),
            }),
        }
    }

    /// `create(resource)` (§4.4). Assigns a fresh id and version 1, stamps
    /// metadata, stores a deep copy, and write-throughs to the pod.
    pub async fn create(
        &self,
        session: &Session,
        pod_base: Option<&str>,
        token: &str,
        mut resource: Value,
    ) -> (String, u32, Value) {
        let id = session.next_id(self.resource_type).to_string();
        let version = 1u32;
        stamp_meta(&mut resource, &id, version);

        session.store(self.resource_type, &id, version, deep_copy(&resource));
        self.write_through(pod_base, token, &id, &resource).await;

        (id, version, resource)
    }

    /// `update(id, resource)` (§4.4). Update-as-create when `id` is
    /// unknown, per §9 open question 3.
    pub async fn update(
        &self,
        session: &Session,
        pod_base: Option<&str>,
        token: &str,
        id: &str,
        mut resource: Value,
    ) -> (u32, Value) {
        let version = session
            .latest_version_number(self.resource_type, id)
            .map(|v| v + 1)
            .unwrap_or(1);
        stamp_meta(&mut resource, id, version);

        session.store(self.resource_type, id, version, deep_copy(&resource));
        self.write_through(pod_base, token, id, &resource).await;

        (version, resource)
    }

    /// `delete(id)` (§4.4). Missing id is **not found**; existing id is
    /// tombstoned and a pod delete is attempted.
    pub async fn delete(
        &self,
        session: &Session,
        pod_base: Option<&str>,
        token: &str,
        id: &str,
    ) -> Result<(), Error> {
        if !session.exists(self.resource_type, id) {
            return Err(Error::NotFound {
                resource_type: self.resource_type.to_string(),
                id: id.to_string(),
            });
        }

        session.delete(self.resource_type, id);

        if let Some(pod_base) = pod_base {
            if self.pod_client.enabled() {
                self.pod_client
                    .delete(pod_base, self.resource_type, id, token)
                    .await;
            }
        }

        Ok(())
    }

    /// `searchAll()` (§4.4): all non-tombstoned latest versions, deep-copied.
    pub fn search_all(&self, session: &Session) -> SearchResult {
        SearchResult {
            resources: session.get_all(self.resource_type).into_iter().map(|r| deep_copy(&r)).collect(),
        }
    }

    /// `searchById(idValue)` (§4.4): read wrapped as a (possibly empty)
    /// bundle; tombstoned/absent never errors here, it yields zero entries.
    pub fn search_by_id(&self, session: &Session, id: &str) -> SearchResult {
        match self.read(session, id, None) {
            Ok(result) => SearchResult {
                resources: vec![result.resource],
            },
            Err(_) => SearchResult { resources: Vec::new() },
        }
    }

    async fn write_through(&self, pod_base: Option<&str>, token: &str, id: &str, resource: &Value) {
        let Some(pod_base) = pod_base else { return };
        if !self.pod_client.enabled() {
            return;
        }
        self.pod_client
            .write(pod_base, self.resource_type, id, token, resource)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolidConfig;
    use serde_json::json;

    fn provider(resource_type: &'static str) -> ResourceProvider {
        ResourceProvider::new(
            resource_type,
            Arc::new(crate::pod::PodClient::new(SolidConfig {
                enabled: false,
                fhir_container_path: "/weare/fhir".to_string(),
                http_timeout_seconds: 30,
            })),
        )
    }

    #[tokio::test]
    async fn create_assigns_id_and_version_one() {
        let provider = provider("Patient");
        let session = Session::new("k1".to_string());
        let (id, version, resource) = provider
            .create(&session, None, "tok", json!({"resourceType": "Patient"}))
            .await;
        assert_eq!(id, "1");
        assert_eq!(version, 1);
        assert_eq!(resource["meta"]["versionId"], "1");
    }

    #[tokio::test]
    async fn update_increments_version_and_create_as_update_starts_at_one() {
        let provider = provider("Patient");
        let session = Session::new("k1".to_string());
        let (id, _, _) = provider
            .create(&session, None, "tok", json!({"resourceType": "Patient"}))
            .await;

        let (version, _) = provider
            .update(&session, None, "tok", &id, json!({"resourceType": "Patient", "name": "Smith"}))
            .await;
        assert_eq!(version, 2);

        let (version, _) = provider
            .update(&session, None, "tok", "never-created", json!({"resourceType": "Patient"}))
            .await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn read_of_tombstoned_id_is_gone_not_not_found() {
        let provider = provider("Patient");
        let session = Session::new("k1".to_string());
        let (id, _, _) = provider
            .create(&session, None, "tok", json!({"resourceType": "Patient"}))
            .await;
        provider.delete(&session, None, "tok", &id).await.unwrap();

        let err = provider.read(&session, &id, None).unwrap_err();
        assert!(matches!(err, Error::Gone { .. }));

        let err = provider.read(&session, &id, Some(1)).unwrap_err();
        assert!(matches!(err, Error::Gone { .. }));

        let err = provider.read(&session, &id, Some(99)).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let err = provider.read(&session, "999", None).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_of_missing_id_is_not_found() {
        let provider = provider("Patient");
        let session = Session::new("k1".to_string());
        let err = provider.delete(&session, None, "tok", "missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn search_all_excludes_tombstoned_and_search_by_id_wraps_read() {
        let provider = provider("Patient");
        let session = Session::new("k1".to_string());
        let (id1, _, _) = provider
            .create(&session, None, "tok", json!({"resourceType": "Patient"}))
            .await;
        let (id2, _, _) = provider
            .create(&session, None, "tok", json!({"resourceType": "Patient"}))
            .await;
        provider.delete(&session, None, "tok", &id2).await.unwrap();

        let all = provider.search_all(&session);
        assert_eq!(all.resources.len(), 1);

        let by_id = provider.search_by_id(&session, &id1);
        assert_eq!(by_id.resources.len(), 1);

        let by_deleted_id = provider.search_by_id(&session, &id2);
        assert!(by_deleted_id.resources.is_empty());
    }

    #[tokio::test]
    async fn returned_resources_do_not_alias_the_store() {
        let provider = provider("Patient");
        let session = Session::new("k1".to_string());
        let (id, _, _) = provider
            .create(&session, None, "tok", json!({"resourceType": "Patient"}))
            .await;

        let mut read = provider.read(&session, &id, None).unwrap().resource;
        read["name"] = json!("mutated");

        let fresh = provider.read(&session, &id, None).unwrap().resource;
        assert_ne!(fresh["name"], json!("mutated"));
    }
}
