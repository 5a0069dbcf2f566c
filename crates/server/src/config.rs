//! Environment-driven configuration for the matching service.
//!
//! Every knob has a default suitable for local development; unset or
//! unparseable variables fall back with a log line rather than
//! panicking.

use match_client::ServiceEndpoints;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// What to do with a group the restaurant matcher could not place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Persist the group with no venue; operators assign one manually.
    #[default]
    KeepWithoutVenue,
    /// Drop the group's rows and return its members to `pending` so a
    /// later run can pick them up.
    RevertToPending,
}

impl FromStr for UnmatchedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep-without-venue" => Ok(UnmatchedPolicy::KeepWithoutVenue),
            "revert-to-pending" => Ok(UnmatchedPolicy::RevertToPending),
            other => Err(format!("unknown unmatched policy: {other}")),
        }
    }
}

impl Display for UnmatchedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnmatchedPolicy::KeepWithoutVenue => write!(f, "keep-without-venue"),
            UnmatchedPolicy::RevertToPending => write!(f, "revert-to-pending"),
        }
    }
}

/// Tuning for one matching run.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub min_participants: usize,
    pub max_distance_km: f64,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    pub unmatched_policy: UnmatchedPolicy,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_participants: roster::MIN_PARTICIPANTS,
            max_distance_km: 10.0,
            request_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(2),
            unmatched_policy: UnmatchedPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub seed_demo: bool,
    pub services: ServiceEndpoints,
    pub matching: MatchingConfig,
}

impl ServerConfig {
    /// Load configuration from `SUPPER_*` environment variables,
    /// falling back to local-development defaults.
    pub fn from_env() -> Self {
        let defaults = ServiceEndpoints::local_defaults();
        Self {
            bind_addr: var_or("SUPPER_BIND_ADDR", "0.0.0.0:3000"),
            seed_demo: parse_or("SUPPER_SEED_DEMO", false),
            services: ServiceEndpoints {
                preference: var_or("SUPPER_PREFERENCE_URL", &defaults.preference),
                people_matcher: var_or("SUPPER_PEOPLE_MATCHER_URL", &defaults.people_matcher),
                group_aggregator: var_or("SUPPER_GROUP_AGGREGATOR_URL", &defaults.group_aggregator),
                restaurant_matcher: var_or(
                    "SUPPER_RESTAURANT_MATCHER_URL",
                    &defaults.restaurant_matcher,
                ),
                feature_worker: var_or("SUPPER_FEATURE_WORKER_URL", &defaults.feature_worker),
            },
            matching: MatchingConfig {
                min_participants: parse_or("SUPPER_MIN_PARTICIPANTS", roster::MIN_PARTICIPANTS),
                max_distance_km: parse_or("SUPPER_MAX_DISTANCE_KM", 10.0),
                request_timeout: Duration::from_secs(parse_or("SUPPER_REQUEST_TIMEOUT_SECS", 30)),
                health_timeout: Duration::from_secs(parse_or("SUPPER_HEALTH_TIMEOUT_SECS", 2)),
                unmatched_policy: parse_or("SUPPER_UNMATCHED_POLICY", UnmatchedPolicy::default()),
            },
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value ({e}), using default: {default}");
            default
        }),
        Err(_) => default,
    }
}
