//! HTTP client for the scoring services.
//!
//! One `ScoringClient` wraps a shared `reqwest::Client` and the injected
//! endpoint table, and exposes a typed method per service call. Every
//! request carries the configured timeout so a stuck upstream cannot
//! hang a matching run indefinitely.

use crate::error::{ClientError, Result};
use crate::types::{
    AggregateGroupRequest, GroupProfile, MatchRequest, MatchResponse, ProcessUserRequest,
    ProcessUserResponse, RestaurantMatchRequest, RestaurantMatchResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use store::types::EMBEDDING_DIM;
use tracing::{debug, error};

/// Service names as they appear in health maps and error messages.
pub mod service_names {
    pub const PREFERENCE: &str = "preference-service";
    pub const PEOPLE_MATCHER: &str = "people-matcher";
    pub const GROUP_AGGREGATOR: &str = "group-aggregator";
    pub const RESTAURANT_MATCHER: &str = "restaurant-matcher";
    pub const FEATURE_WORKER: &str = "feature-worker";
}

/// Base URLs for every downstream collaborator, injected rather than
/// hardcoded so tests and deployments can point the pipeline anywhere.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub preference: String,
    pub people_matcher: String,
    pub group_aggregator: String,
    pub restaurant_matcher: String,
    /// The queue-based profile feature worker. Never called by the
    /// pipeline, but its liveness is gated: stale features make
    /// matching output garbage.
    pub feature_worker: String,
}

impl ServiceEndpoints {
    /// The fixed local ports used in development.
    pub fn local_defaults() -> Self {
        Self {
            preference: "http://localhost:8101".to_string(),
            people_matcher: "http://localhost:8102".to_string(),
            group_aggregator: "http://localhost:8103".to_string(),
            restaurant_matcher: "http://localhost:8104".to_string(),
            feature_worker: "http://localhost:8105".to_string(),
        }
    }

    /// (service name, liveness URL) for every collaborator. The people
    /// matcher exposes its health under its API prefix; the rest use
    /// a bare `/health`.
    pub fn health_targets(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                service_names::PREFERENCE,
                join(&self.preference, "health"),
            ),
            (
                service_names::PEOPLE_MATCHER,
                join(&self.people_matcher, "api/v1/health"),
            ),
            (
                service_names::GROUP_AGGREGATOR,
                join(&self.group_aggregator, "health"),
            ),
            (
                service_names::RESTAURANT_MATCHER,
                join(&self.restaurant_matcher, "health"),
            ),
            (
                service_names::FEATURE_WORKER,
                join(&self.feature_worker, "health"),
            ),
        ]
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Typed client for the four scoring services.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    client: reqwest::Client,
    endpoints: ServiceEndpoints,
}

impl ScoringClient {
    /// Build a client with the given endpoint table and per-request
    /// timeout.
    pub fn new(endpoints: ServiceEndpoints, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Borrow the underlying HTTP client (health probes reuse it with
    /// their own shorter timeout).
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Submit one user's embedding bundle and receive their compact
    /// preference vector.
    pub async fn process_user(&self, request: &ProcessUserRequest) -> Result<ProcessUserResponse> {
        let response: ProcessUserResponse = self
            .post(
                service_names::PREFERENCE,
                &self.endpoints.preference,
                "process-user",
                request,
            )
            .await?;
        if response.preference_vector.len() != EMBEDDING_DIM {
            return Err(ClientError::InvalidResponse {
                service: service_names::PREFERENCE,
                reason: format!(
                    "expected a {}-dim preference vector, got {}",
                    EMBEDDING_DIM,
                    response.preference_vector.len()
                ),
            });
        }
        Ok(response)
    }

    /// Partition the full participant set into compatibility groups.
    pub async fn match_participants(&self, request: &MatchRequest) -> Result<MatchResponse> {
        debug!(
            "Submitting {} participants to the people matcher",
            request.participants.len()
        );
        let response: MatchResponse = self
            .post(
                service_names::PEOPLE_MATCHER,
                &self.endpoints.people_matcher,
                "api/v1/match",
                request,
            )
            .await?;
        for group in &response.groups {
            if group.members.len() != group.size as usize {
                error!(
                    "People matcher group {} advertises size {} but lists {} members",
                    group.group_id,
                    group.size,
                    group.members.len()
                );
                return Err(ClientError::InvalidResponse {
                    service: service_names::PEOPLE_MATCHER,
                    reason: format!(
                        "group {} size/member mismatch ({} vs {})",
                        group.group_id,
                        group.size,
                        group.members.len()
                    ),
                });
            }
        }
        Ok(response)
    }

    /// Combine one group's members into a single group profile.
    pub async fn aggregate_group(&self, request: &AggregateGroupRequest) -> Result<GroupProfile> {
        self.post(
            service_names::GROUP_AGGREGATOR,
            &self.endpoints.group_aggregator,
            "aggregate-group",
            request,
        )
        .await
    }

    /// Assign restaurants to group profiles within the distance bound.
    pub async fn match_restaurants(
        &self,
        request: &RestaurantMatchRequest,
    ) -> Result<RestaurantMatchResponse> {
        self.post(
            service_names::RESTAURANT_MATCHER,
            &self.endpoints.restaurant_matcher,
            "match-groups",
            request,
        )
        .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        service: &'static str,
        base: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = join(base, path);
        debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport { service, source })?;
        let status = response.status();
        if !status.is_success() {
            error!("{service} answered {status} for {url}");
            return Err(ClientError::Service {
                service,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                service,
                reason: e.to_string(),
            })
    }
}
