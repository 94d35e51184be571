//! On-first-use session population, from the pod or from embedded dev data
//! (§4.6).

use crate::{auth::RequestContext, error::Error, resources::USER_DATA_RESOURCE_TYPES, session::Session, state::AppState, testdata};

/// Hydrates `session` exactly once if it has not already been hydrated,
/// guarded by the session's own once-latch so concurrent first-use
/// requests never run this twice (§9 open question 2).
pub async fn hydrate_if_needed(
    state: &AppState,
    session: &Session,
    context: &RequestContext,
) -> Result<(), Error> {
    if session.hydrated() {
        return Ok(());
    }

    let pod_base = state.pod_client.pod_base(&context.subject);

    session
        .hydrate_once(|| async {
            for resource_type in USER_DATA_RESOURCE_TYPES {
                let resources = if state.pod_client.enabled() {
                    match &pod_base {
                        Some(pod_base) => {
                            state
                                .pod_client
                                .list(pod_base, resource_type, &context.token)
                                .await
                        }
                        None => {
                            tracing::warn!(
                                subject = %context.subject,
                                "could not derive pod base from subject, falling back to dev data"
                            );
                            testdata::load(resource_type)
                        }
                    }
                } else {
                    testdata::load(resource_type)
                };

                for resource in resources {
                    let Some(id) = resource.get("id").and_then(|v| v.as_str()).map(str::to_string) else {
                        continue;
                    };
                    let version = resource
                        .get("meta")
                        .and_then(|m| m.get("versionId"))
                        .and_then(|v| v.as_str())
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(1);
                    session.store(resource_type, &id, version, resource);
                }
            }
        })
        .await;

    Ok(())
}
