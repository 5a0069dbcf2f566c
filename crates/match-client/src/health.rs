//! Liveness probes for the downstream collaborator services.
//!
//! The pipeline has no partial-success mode, so failing fast before any
//! database write is cheaper than failing mid-run. The coordinator
//! gates on this check; it is also exposed as a standalone diagnostic
//! endpoint for operators.

use crate::clients::ServiceEndpoints;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-probe timeout.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Probe every collaborator's liveness endpoint.
///
/// Each probe is independent: any connection error, timeout, or
/// non-200 marks exactly that service unhealthy and leaves the others
/// to their own probe result.
pub async fn check_services_health(
    client: &reqwest::Client,
    endpoints: &ServiceEndpoints,
    timeout: Duration,
) -> HashMap<String, bool> {
    let mut statuses = HashMap::new();
    for (name, url) in endpoints.health_targets() {
        let healthy = match client.get(&url).timeout(timeout).send().await {
            Ok(response) => response.status().as_u16() == 200,
            Err(e) => {
                warn!("Health probe for {name} failed: {e}");
                false
            }
        };
        debug!("{name}: {}", if healthy { "healthy" } else { "unhealthy" });
        statuses.insert(name.to_string(), healthy);
    }
    statuses
}

/// Names of the services marked unhealthy, sorted for stable error
/// messages.
pub fn unhealthy_services(statuses: &HashMap<String, bool>) -> Vec<String> {
    let mut names: Vec<String> = statuses
        .iter()
        .filter(|(_, healthy)| !**healthy)
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}
