//! # Matching Pipeline Coordinator
//!
//! This module drives the entire group-matching pipeline for one time
//! slot:
//! 1. Gate on the health of all five collaborator services
//! 2. Load the confirmed roster (minimum headcount enforced)
//! 3. Atomically claim the slot against concurrent runs
//! 4. Vectorize each participant (embedding bundle → preference vector)
//! 5. Partition participants into compatibility groups
//! 6. Aggregate each group into a combined profile
//! 7. Assign restaurants within the distance bound
//! 8. Persist everything, all-or-nothing
//!
//! Stages run strictly in order with no inter-stage retries: any stage
//! failure aborts the run, releases the claim, and leaves signups
//! untouched. The only tolerated partial failure is per-user
//! vectorization, which drops the user from the run and reports them in
//! `MatchingOutcome::dropped_users`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MatchingConfig;
use crate::persist::ResultPersister;
use embedding::EmbeddingBuilder;
use match_client::{
    check_services_health, service_names, unhealthy_services, AggregateGroupRequest,
    AggregateMember, ClientError, GroupProfile, MatchParticipant, MatchRequest, MatchedGroup,
    ProcessUserRequest, RestaurantMatch, RestaurantMatchRequest, ScoringClient,
};
use roster::{build_participant, load_roster, RosterError};
use store::{DinnerGroup, MatchStore, StoreError, TimeSlotId, UserId, UserProfile};

/// A roster member excluded from the run, and why.
#[derive(Debug, Clone, Serialize)]
pub struct DroppedUser {
    pub user_id: UserId,
    pub reason: String,
}

/// The result of one completed matching run.
#[derive(Debug, Clone, Serialize)]
pub struct MatchingOutcome {
    pub time_slot_id: TimeSlotId,
    /// Group rows as persisted, venue assignments included.
    pub groups: Vec<DinnerGroup>,
    pub matches: Vec<RestaurantMatch>,
    pub unmatched_group_count: usize,
    pub matched_user_ids: Vec<UserId>,
    /// Roster members silently excluded in the source system; surfaced
    /// here so callers can see who got no group.
    pub dropped_users: Vec<DroppedUser>,
}

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Unhealthy services: {}", .0.join(", "))]
    UnhealthyServices(Vec<String>),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{stage} failed: {source}")]
    Upstream {
        stage: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Failed to persist matching results: {0}")]
    Persist(#[source] StoreError),
}

const STAGE_PEOPLE_MATCHING: &str = "People matching";
const STAGE_AGGREGATION: &str = "Group aggregation";
const STAGE_RESTAURANT_MATCHING: &str = "Restaurant matching";

/// Main coordinator for the matching pipeline.
pub struct MatchingCoordinator {
    store: Arc<MatchStore>,
    scoring: ScoringClient,
    builder: EmbeddingBuilder,
    config: MatchingConfig,
}

impl MatchingCoordinator {
    pub fn new(store: Arc<MatchStore>, scoring: ScoringClient, config: MatchingConfig) -> Self {
        Self {
            store,
            scoring,
            builder: EmbeddingBuilder::new(),
            config,
        }
    }

    /// Probe all collaborator services. Used by the preflight gate and
    /// exposed directly as a diagnostic endpoint.
    pub async fn services_health(&self) -> HashMap<String, bool> {
        check_services_health(
            self.scoring.http(),
            self.scoring.endpoints(),
            self.config.health_timeout,
        )
        .await
    }

    /// Run the complete pipeline for one time slot.
    pub async fn run_complete_matching(
        &self,
        slot_id: TimeSlotId,
    ) -> Result<MatchingOutcome, CoordinatorError> {
        let start = Instant::now();

        // Preflight: all five collaborators must be up before anything
        // else happens. There is no partial-success mode, so failing
        // here is cheaper than failing mid-pipeline.
        let statuses = self.services_health().await;
        let unhealthy = unhealthy_services(&statuses);
        if !unhealthy.is_empty() {
            return Err(CoordinatorError::UnhealthyServices(unhealthy));
        }
        info!("All {} collaborator services healthy", statuses.len());

        // Preflight: minimum headcount.
        let roster = load_roster(&self.store, slot_id, self.config.min_participants).await?;
        info!("Roster loaded for slot {slot_id}: {} confirmed", roster.len());

        // Preflight: claim the slot. Refuses already-grouped slots and
        // concurrent runs atomically.
        self.store.begin_grouping(slot_id).await?;

        match self.run_pipeline(slot_id, roster).await {
            Ok(outcome) => {
                info!(
                    "Matching run for slot {slot_id} complete in {:.2?}: {} groups, {} unmatched, {} dropped",
                    start.elapsed(),
                    outcome.groups.len(),
                    outcome.unmatched_group_count,
                    outcome.dropped_users.len()
                );
                Ok(outcome)
            }
            Err(e) => {
                // Release the claim so the slot can be re-triggered.
                self.store.abort_grouping(slot_id).await;
                Err(e)
            }
        }
    }

    /// The post-claim stages. Failures propagate to the caller, which
    /// releases the claim.
    async fn run_pipeline(
        &self,
        slot_id: TimeSlotId,
        roster: Vec<UserId>,
    ) -> Result<MatchingOutcome, CoordinatorError> {
        let roster_len = roster.len();
        let (participants, dropped) = self.vectorize_roster(slot_id, &roster).await;
        info!(
            "Vectorized {} of {roster_len} roster members",
            participants.len()
        );

        let response = self
            .scoring
            .match_participants(&MatchRequest {
                participants: participants.clone(),
            })
            .await
            .map_err(|source| CoordinatorError::Upstream {
                stage: STAGE_PEOPLE_MATCHING,
                source,
            })?;
        let groups = response.groups;
        info!("People matcher produced {} groups", groups.len());

        let grouped_count: usize = groups.iter().map(|g| g.members.len()).sum();
        if grouped_count != participants.len() {
            warn!(
                "Group set is incomplete: {} participants submitted, {grouped_count} grouped",
                participants.len()
            );
        }

        let profiles = self.aggregate_groups(&groups, &participants).await?;
        info!("Aggregated {} group profiles", profiles.len());

        let catalog = self.store.restaurants().await;
        let restaurant_response = self
            .scoring
            .match_restaurants(&RestaurantMatchRequest {
                groups: profiles,
                restaurants: catalog,
                max_distance_km: self.config.max_distance_km,
            })
            .await
            .map_err(|source| CoordinatorError::Upstream {
                stage: STAGE_RESTAURANT_MATCHING,
                source,
            })?;
        info!(
            "Restaurant matcher assigned {} groups, {} unmatched",
            restaurant_response.matches.len(),
            restaurant_response.unmatched_groups.len()
        );

        let persister = ResultPersister::new(self.store.clone(), self.config.unmatched_policy);
        let summary = persister
            .persist(slot_id, &groups, &restaurant_response.matches)
            .await
            .map_err(CoordinatorError::Persist)?;

        let matched_user_ids: Vec<UserId> = summary
            .groups
            .iter()
            .flat_map(|group| {
                let group_members: Vec<UserId> = groups
                    .iter()
                    .find(|g| g.group_id == group.id)
                    .map(|g| g.members.clone())
                    .unwrap_or_default();
                group_members
            })
            .collect();

        Ok(MatchingOutcome {
            time_slot_id: slot_id,
            groups: summary.groups,
            matches: restaurant_response.matches,
            unmatched_group_count: restaurant_response.unmatched_groups.len(),
            matched_user_ids,
            dropped_users: dropped,
        })
    }

    /// Stages 1–2: assemble participant contexts and obtain a preference
    /// vector per user.
    ///
    /// Embedding construction is batched on the rayon pool; the
    /// per-user calls to the preference service run in roster order.
    /// Users whose profile is missing or whose vectorization fails are
    /// dropped from the run with a logged reason; their signups stay
    /// confirmed.
    async fn vectorize_roster(
        &self,
        slot_id: TimeSlotId,
        roster: &[UserId],
    ) -> (Vec<MatchParticipant>, Vec<DroppedUser>) {
        let mut contexts = Vec::with_capacity(roster.len());
        let mut dropped = Vec::new();

        for &user_id in roster {
            let profile: UserProfile = match self.store.profile(user_id).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!("Dropping user {user_id} from the run: {e}");
                    dropped.push(DroppedUser {
                        user_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            match build_participant(&self.store, slot_id, user_id).await {
                Ok(participant) => contexts.push((participant, profile)),
                Err(e) => {
                    warn!("Dropping user {user_id} from the run: {e}");
                    dropped.push(DroppedUser {
                        user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let profiles: Vec<UserProfile> =
            contexts.iter().map(|(_, profile)| profile.clone()).collect();
        let bundles = self.builder.build_bundles(&profiles);

        let mut participants = Vec::with_capacity(contexts.len());
        for ((participant, _), bundle) in contexts.into_iter().zip(bundles) {
            let request = ProcessUserRequest {
                user_id: participant.user_id,
                embeddings: bundle.embeddings,
            };
            match self.scoring.process_user(&request).await {
                Ok(response) => participants.push(MatchParticipant {
                    user_id: participant.user_id,
                    name: participant.name,
                    dietary_restrictions: participant.dietary_restrictions,
                    budget: participant.budget,
                    location: participant.location,
                    preference_vector: response.preference_vector,
                }),
                Err(e) => {
                    warn!(
                        "Vectorization failed for user {}: {e}",
                        participant.user_id
                    );
                    dropped.push(DroppedUser {
                        user_id: participant.user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (participants, dropped)
    }

    /// Stage 4: one combined profile per group, requested sequentially
    /// and reassembled by group id.
    async fn aggregate_groups(
        &self,
        groups: &[MatchedGroup],
        participants: &[MatchParticipant],
    ) -> Result<Vec<GroupProfile>, CoordinatorError> {
        let by_user: HashMap<UserId, &MatchParticipant> =
            participants.iter().map(|p| (p.user_id, p)).collect();

        let mut profiles = Vec::with_capacity(groups.len());
        for group in groups {
            let mut members = Vec::with_capacity(group.members.len());
            for user_id in &group.members {
                let participant =
                    by_user
                        .get(user_id)
                        .ok_or_else(|| CoordinatorError::Upstream {
                            stage: STAGE_PEOPLE_MATCHING,
                            source: ClientError::InvalidResponse {
                                service: service_names::PEOPLE_MATCHER,
                                reason: format!(
                                    "group {} references unknown participant {user_id}",
                                    group.group_id
                                ),
                            },
                        })?;
                members.push(AggregateMember {
                    user_id: *user_id,
                    dietary_restrictions: participant.dietary_restrictions.clone(),
                    budget: participant.budget,
                    preference_vector: participant.preference_vector.clone(),
                });
            }

            let profile = self
                .scoring
                .aggregate_group(&AggregateGroupRequest {
                    group_id: group.group_id.clone(),
                    members,
                })
                .await
                .map_err(|source| CoordinatorError::Upstream {
                    stage: STAGE_AGGREGATION,
                    source,
                })?;
            if profile.group_id != group.group_id {
                return Err(CoordinatorError::Upstream {
                    stage: STAGE_AGGREGATION,
                    source: ClientError::InvalidResponse {
                        service: service_names::GROUP_AGGREGATOR,
                        reason: format!(
                            "profile for group {} came back labelled {}",
                            group.group_id, profile.group_id
                        ),
                    },
                });
            }
            profiles.push(profile);
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnmatchedPolicy;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::Utc;
    use match_client::ServiceEndpoints;
    use serde_json::{json, Value};
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use store::types::EMBEDDING_DIM;
    use store::{
        GroupMember, GroupStatus, Signup, SignupStatus, SlotStatus, TimeSlot, UserProfile,
    };
    use uuid::Uuid;

    // ============================================================================
    // Mock Scoring Services
    // ============================================================================

    #[derive(Default)]
    struct Counters {
        process_user: AtomicUsize,
        people_match: AtomicUsize,
        aggregate: AtomicUsize,
        restaurant_match: AtomicUsize,
    }

    /// Behavior knobs for one mock fleet. Built per test, immutable
    /// once the services are up.
    #[derive(Default)]
    struct MockCfg {
        /// Partition chunk size; 0 means the default of 6.
        group_size: usize,
        /// Return 500 from /process-user for this user.
        preference_fail_for: Option<Uuid>,
        /// Services whose health endpoint reports 503.
        unhealthy: Vec<&'static str>,
        aggregator_fails: bool,
        /// Restaurant matcher reports the first group unmatched.
        unmatched_first_group: bool,
        counters: Counters,
    }

    type MockState = (Arc<MockCfg>, &'static str);

    async fn mock_health(State((cfg, name)): State<MockState>) -> Response {
        if cfg.unhealthy.contains(&name) {
            (StatusCode::SERVICE_UNAVAILABLE, "down").into_response()
        } else {
            "ok".into_response()
        }
    }

    async fn mock_process_user(
        State((cfg, _)): State<MockState>,
        Json(body): Json<Value>,
    ) -> Response {
        cfg.counters.process_user.fetch_add(1, Ordering::SeqCst);
        let user_id = body["user_id"].as_str().unwrap_or_default().to_string();
        if cfg.preference_fail_for.map(|u| u.to_string()) == Some(user_id) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "no features on file").into_response();
        }
        Json(json!({ "preference_vector": vec![0.42f32; EMBEDDING_DIM] })).into_response()
    }

    async fn mock_people_match(
        State((cfg, _)): State<MockState>,
        Json(body): Json<Value>,
    ) -> Response {
        cfg.counters.people_match.fetch_add(1, Ordering::SeqCst);
        let ids: Vec<String> = body["participants"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .iter()
            .map(|p| p["user_id"].as_str().unwrap_or_default().to_string())
            .collect();
        let size = if cfg.group_size == 0 { 6 } else { cfg.group_size };
        let groups: Vec<Value> = ids
            .chunks(size)
            .enumerate()
            .map(|(i, chunk)| {
                json!({
                    "group_id": format!("group-{}", i + 1),
                    "members": chunk,
                    "size": chunk.len(),
                    "compatibility_score": 0.8 + 0.02 * i as f32,
                })
            })
            .collect();
        Json(json!({ "groups": groups })).into_response()
    }

    async fn mock_aggregate(
        State((cfg, _)): State<MockState>,
        Json(body): Json<Value>,
    ) -> Response {
        cfg.counters.aggregate.fetch_add(1, Ordering::SeqCst);
        if cfg.aggregator_fails {
            return (StatusCode::INTERNAL_SERVER_ERROR, "aggregation failed").into_response();
        }
        Json(json!({
            "group_id": body["group_id"],
            "preference_vector": vec![0.5f32; EMBEDDING_DIM],
            "dietary_restrictions": ["vegetarian"],
            "budget": "medium",
        }))
        .into_response()
    }

    async fn mock_match_groups(
        State((cfg, _)): State<MockState>,
        Json(body): Json<Value>,
    ) -> Response {
        cfg.counters.restaurant_match.fetch_add(1, Ordering::SeqCst);
        let groups = body["groups"].as_array().cloned().unwrap_or_default();
        let restaurant = body["restaurants"]
            .get(0)
            .cloned()
            .unwrap_or_else(|| json!({ "id": "rest-001", "name": "Golden Lotus" }));

        let mut matches = Vec::new();
        let mut unmatched = Vec::new();
        for (i, group) in groups.iter().enumerate() {
            let group_id = group["group_id"].as_str().unwrap_or_default().to_string();
            if cfg.unmatched_first_group && i == 0 {
                unmatched.push(group_id);
                continue;
            }
            matches.push(json!({
                "group_id": group_id,
                "restaurant_id": restaurant["id"],
                "restaurant_name": restaurant["name"],
                "similarity_score": 0.9,
                "distance_km": 1.2,
                "match_reasons": ["cuisine overlap"],
            }));
        }
        Json(json!({ "matches": matches, "unmatched_groups": unmatched })).into_response()
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Stand up the full fleet of mock services, one listener each.
    async fn spawn_mock_services(cfg: Arc<MockCfg>) -> ServiceEndpoints {
        let preference = spawn(
            Router::new()
                .route("/health", get(mock_health))
                .route("/process-user", post(mock_process_user))
                .with_state((cfg.clone(), service_names::PREFERENCE)),
        )
        .await;
        let people_matcher = spawn(
            Router::new()
                .route("/api/v1/health", get(mock_health))
                .route("/api/v1/match", post(mock_people_match))
                .with_state((cfg.clone(), service_names::PEOPLE_MATCHER)),
        )
        .await;
        let group_aggregator = spawn(
            Router::new()
                .route("/health", get(mock_health))
                .route("/aggregate-group", post(mock_aggregate))
                .with_state((cfg.clone(), service_names::GROUP_AGGREGATOR)),
        )
        .await;
        let restaurant_matcher = spawn(
            Router::new()
                .route("/health", get(mock_health))
                .route("/match-groups", post(mock_match_groups))
                .with_state((cfg.clone(), service_names::RESTAURANT_MATCHER)),
        )
        .await;
        let feature_worker = spawn(
            Router::new()
                .route("/health", get(mock_health))
                .with_state((cfg.clone(), service_names::FEATURE_WORKER)),
        )
        .await;

        ServiceEndpoints {
            preference,
            people_matcher,
            group_aggregator,
            restaurant_matcher,
            feature_worker,
        }
    }

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    async fn seed_slot_with_users(store: &MatchStore, count: usize) -> (TimeSlotId, Vec<UserId>) {
        let slot = TimeSlot {
            id: Uuid::new_v4(),
            starts_at: Utc::now(),
            city: "New York".to_string(),
            status: SlotStatus::Open,
            signup_count: 0,
            max_signups: 40,
        };
        let slot_id = slot.id;
        store.insert_time_slot(slot).await;
        store.set_restaurants(roster::catalog::default_catalog()).await;

        let mut users = Vec::new();
        for i in 0..count {
            let user_id = Uuid::new_v4();
            let mut features = StdHashMap::new();
            features.insert("social_level".to_string(), 0.4 + 0.03 * i as f32);
            store
                .insert_profile(UserProfile {
                    user_id,
                    name: format!("User {i}"),
                    zipcode: "10001".to_string(),
                    cuisine_preferences: vec!["thai".to_string()],
                    dietary_restrictions: vec![],
                    price_range: (20, 45),
                    features,
                })
                .await;
            store
                .insert_signup(Signup {
                    user_id,
                    time_slot_id: slot_id,
                    status: SignupStatus::Confirmed,
                    dietary_restrictions: vec![],
                })
                .await
                .unwrap();
            users.push(user_id);
        }
        (slot_id, users)
    }

    async fn build_coordinator(
        store: Arc<MatchStore>,
        cfg: Arc<MockCfg>,
        policy: UnmatchedPolicy,
    ) -> MatchingCoordinator {
        let endpoints = spawn_mock_services(cfg).await;
        let scoring = ScoringClient::new(endpoints, Duration::from_secs(5)).unwrap();
        let config = MatchingConfig {
            unmatched_policy: policy,
            ..MatchingConfig::default()
        };
        MatchingCoordinator::new(store, scoring, config)
    }

    // ============================================================================
    // Precondition Tests
    // ============================================================================

    #[tokio::test]
    async fn insufficient_signups_stops_before_any_matching_call() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, _) = seed_slot_with_users(&store, 5).await;
        let cfg = Arc::new(MockCfg::default());
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let err = coordinator.run_complete_matching(slot_id).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Roster(RosterError::InsufficientSignups { found: 5, .. })
        ));

        // Nothing beyond the health probes went out.
        assert_eq!(cfg.counters.process_user.load(Ordering::SeqCst), 0);
        assert_eq!(cfg.counters.people_match.load(Ordering::SeqCst), 0);
        assert_eq!(cfg.counters.aggregate.load(Ordering::SeqCst), 0);
        assert_eq!(cfg.counters.restaurant_match.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn already_grouped_slot_is_refused() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 13).await;

        // Persist one pre-existing group for the thirteenth user; the
        // other twelve stay confirmed.
        store.begin_grouping(slot_id).await.unwrap();
        store
            .persist_run(
                slot_id,
                vec![DinnerGroup {
                    id: "stale-group".to_string(),
                    time_slot_id: slot_id,
                    size: 1,
                    compatibility_score: 0.5,
                    status: GroupStatus::Matched,
                    restaurant: None,
                }],
                vec![GroupMember {
                    group_id: "stale-group".to_string(),
                    user_id: users[12],
                }],
            )
            .await
            .unwrap();

        let cfg = Arc::new(MockCfg::default());
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let err = coordinator.run_complete_matching(slot_id).await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::Store(StoreError::AlreadyGrouped(_))
        ));
        assert_eq!(cfg.counters.people_match.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unhealthy_service_aborts_with_its_name() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, _) = seed_slot_with_users(&store, 12).await;
        let cfg = Arc::new(MockCfg {
            unhealthy: vec![service_names::PEOPLE_MATCHER],
            ..MockCfg::default()
        });
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let err = coordinator.run_complete_matching(slot_id).await.unwrap_err();
        match err {
            CoordinatorError::UnhealthyServices(names) => {
                assert_eq!(names, vec![service_names::PEOPLE_MATCHER.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cfg.counters.process_user.load(Ordering::SeqCst), 0);
    }

    // ============================================================================
    // Full Run Scenarios
    // ============================================================================

    #[tokio::test]
    async fn twelve_users_two_groups_both_matched() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 12).await;
        let cfg = Arc::new(MockCfg::default());
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let outcome = coordinator.run_complete_matching(slot_id).await.unwrap();

        assert_eq!(outcome.groups.len(), 2);
        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.unmatched_group_count, 0);
        assert_eq!(outcome.matched_user_ids.len(), 12);
        assert!(outcome.dropped_users.is_empty());
        assert!(outcome.groups.iter().all(|g| g.restaurant.is_some()));

        // Persisted state matches the outcome.
        assert_eq!(store.groups_for_slot(slot_id).await.len(), 2);
        assert_eq!(store.members_for_group("group-1").await.len(), 6);
        assert_eq!(store.members_for_group("group-2").await.len(), 6);
        for user in &users {
            assert_eq!(
                store.signup_status(slot_id, *user).await,
                Some(SignupStatus::Grouped)
            );
        }
        assert_eq!(
            store.time_slot(slot_id).await.unwrap().status,
            SlotStatus::Grouped
        );

        // One vectorization call per roster member, one call per group.
        assert_eq!(cfg.counters.process_user.load(Ordering::SeqCst), 12);
        assert_eq!(cfg.counters.people_match.load(Ordering::SeqCst), 1);
        assert_eq!(cfg.counters.aggregate.load(Ordering::SeqCst), 2);
        assert_eq!(cfg.counters.restaurant_match.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmatched_group_is_persisted_without_a_venue() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, _) = seed_slot_with_users(&store, 12).await;
        let cfg = Arc::new(MockCfg {
            unmatched_first_group: true,
            ..MockCfg::default()
        });
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let outcome = coordinator.run_complete_matching(slot_id).await.unwrap();

        assert_eq!(outcome.unmatched_group_count, 1);
        assert_eq!(outcome.groups.len(), 2);
        let persisted = store.groups_for_slot(slot_id).await;
        let unmatched = persisted.iter().find(|g| g.id == "group-1").unwrap();
        let matched = persisted.iter().find(|g| g.id == "group-2").unwrap();
        assert!(unmatched.restaurant.is_none());
        assert!(matched.restaurant.is_some());
    }

    #[tokio::test]
    async fn vectorization_failure_drops_the_user_but_not_the_run() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 12).await;
        let cfg = Arc::new(MockCfg {
            preference_fail_for: Some(users[0]),
            ..MockCfg::default()
        });
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let outcome = coordinator.run_complete_matching(slot_id).await.unwrap();

        assert_eq!(outcome.dropped_users.len(), 1);
        assert_eq!(outcome.dropped_users[0].user_id, users[0]);
        assert_eq!(outcome.matched_user_ids.len(), 11);

        // Eleven survivors partition into 6 + 5.
        assert_eq!(store.members_for_group("group-1").await.len(), 6);
        assert_eq!(store.members_for_group("group-2").await.len(), 5);

        // The dropped user keeps their confirmed signup and gets no group.
        assert_eq!(
            store.signup_status(slot_id, users[0]).await,
            Some(SignupStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn upstream_failure_aborts_and_releases_the_claim() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 12).await;
        let cfg = Arc::new(MockCfg {
            aggregator_fails: true,
            ..MockCfg::default()
        });
        let coordinator =
            build_coordinator(store.clone(), cfg.clone(), UnmatchedPolicy::KeepWithoutVenue).await;

        let err = coordinator.run_complete_matching(slot_id).await.unwrap_err();
        match err {
            CoordinatorError::Upstream { stage, .. } => assert_eq!(stage, STAGE_AGGREGATION),
            other => panic!("unexpected error: {other}"),
        }

        // No partial writes, signups untouched, claim released.
        assert!(store.groups_for_slot(slot_id).await.is_empty());
        assert_eq!(
            store.signup_status(slot_id, users[0]).await,
            Some(SignupStatus::Confirmed)
        );
        assert!(store.begin_grouping(slot_id).await.is_ok());
    }
}
