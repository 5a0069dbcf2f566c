//! Server crate for the SupperMatch matching service.
//!
//! This crate contains the pipeline coordinator, the result persister,
//! the HTTP surface that exposes them, and the service configuration.

pub mod config;
pub mod orchestrator;
pub mod persist;
pub mod routes;

pub use config::{MatchingConfig, ServerConfig, UnmatchedPolicy};
pub use orchestrator::{CoordinatorError, DroppedUser, MatchingCoordinator, MatchingOutcome};
pub use persist::{PersistSummary, ResultPersister};
pub use routes::{router, AppState};
