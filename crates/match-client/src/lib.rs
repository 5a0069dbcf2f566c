//! Typed HTTP clients for the external scoring services.
//!
//! The matching pipeline composes four external collaborators over
//! HTTP+JSON (preference processing, people matching, group
//! aggregation, restaurant matching), plus liveness probes across
//! all five downstream services. This crate owns:
//! - the wire types for each service's request/response contract
//! - a `ScoringClient` with one typed method per call and response
//!   validation (vector dimensions, group size consistency)
//! - the injected `ServiceEndpoints` table
//! - the 2-second health probes the coordinator gates on

pub mod clients;
pub mod error;
pub mod health;
pub mod types;

pub use clients::{service_names, ScoringClient, ServiceEndpoints};
pub use error::ClientError;
pub use health::{check_services_health, unhealthy_services, HEALTH_TIMEOUT};
pub use types::{
    AggregateGroupRequest, AggregateMember, GroupProfile, MatchParticipant, MatchRequest,
    MatchResponse, MatchedGroup, ProcessUserRequest, ProcessUserResponse, RestaurantMatch,
    RestaurantMatchRequest, RestaurantMatchResponse,
};
