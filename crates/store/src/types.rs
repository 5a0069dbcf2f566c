//! Core domain types for the dinner-matching system.
//!
//! This module defines the rows the matching pipeline reads and writes:
//! time slots, signups, user profiles, restaurants, dinner groups, and
//! group memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up the various identifiers.

/// Unique identifier for a user.
pub type UserId = Uuid;

/// Unique identifier for a bookable time slot.
pub type TimeSlotId = Uuid;

/// Identifier assigned to a dinner group by the people matcher.
pub type GroupId = String;

/// Identifier for a restaurant in the catalog.
pub type RestaurantId = String;

/// Dimensionality of every preference/cuisine embedding in the system.
pub const EMBEDDING_DIM: usize = 768;

// =============================================================================
// Time Slots and Signups
// =============================================================================

/// A bookable date/time + city unit that users sign up for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub starts_at: DateTime<Utc>,
    pub city: String,
    pub status: SlotStatus,
    pub signup_count: u32,
    pub max_signups: u32,
}

/// Lifecycle of a time slot. A slot becomes `Grouped` once the matching
/// pipeline has persisted groups for it; no further signups are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Open,
    Grouped,
    Cancelled,
}

/// A user's intent to attend a given time slot.
///
/// Invariant: at most one active (non-cancelled) signup per
/// (user, time slot) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signup {
    pub user_id: UserId,
    pub time_slot_id: TimeSlotId,
    pub status: SignupStatus,
    pub dietary_restrictions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupStatus {
    Pending,
    Confirmed,
    Grouped,
    Cancelled,
}

impl SignupStatus {
    /// Whether this signup still counts against the one-per-slot invariant.
    pub fn is_active(self) -> bool {
        !matches!(self, SignupStatus::Cancelled)
    }
}

// =============================================================================
// User Profiles
// =============================================================================

/// Stored profile and feature data for one user.
///
/// The matching pipeline only reads profiles; it never mutates them.
/// `features` is a sparse map of named scalars (personality scores,
/// cuisine affinities, behavioral signals) populated by the feature
/// worker that runs elsewhere in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
    pub zipcode: String,
    pub cuisine_preferences: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    /// (floor, ceiling) of what the user is willing to spend.
    pub price_range: (u32, u32),
    pub features: HashMap<String, f32>,
}

/// Coarse budget bucketing used by the people matcher.
///
/// The matcher operates on tiers, not raw currency amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Low,
    Medium,
    High,
}

impl BudgetTier {
    /// Bucket a price ceiling into a tier.
    ///
    /// Thresholds: ceiling <= 30 is `Low`, <= 60 is `Medium`, above is `High`.
    pub fn from_price_ceiling(ceiling: u32) -> Self {
        if ceiling <= 30 {
            BudgetTier::Low
        } else if ceiling <= 60 {
            BudgetTier::Medium
        } else {
            BudgetTier::High
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetTier::Low => "low",
            BudgetTier::Medium => "medium",
            BudgetTier::High => "high",
        }
    }
}

// =============================================================================
// Restaurants
// =============================================================================

/// A point on the map. Distances are computed by the restaurant matcher;
/// we only carry coordinates around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One entry in the restaurant catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    /// 768-dim cuisine embedding, same space as group preference vectors.
    pub cuisine_vector: Vec<f32>,
    pub dietary_options: Vec<String>,
    pub price_range: (u32, u32),
    pub location: GeoPoint,
    pub capacity: u32,
    pub rating: f32,
}

// =============================================================================
// Dinner Groups
// =============================================================================

/// A persisted dinner group produced by one matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinnerGroup {
    pub id: GroupId,
    pub time_slot_id: TimeSlotId,
    pub size: u32,
    pub compatibility_score: f32,
    pub status: GroupStatus,
    /// Set when the restaurant matcher found a venue within the distance
    /// bound; `None` for groups that remain unmatched.
    pub restaurant: Option<RestaurantAssignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Matched,
}

/// Restaurant columns on a dinner group row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantAssignment {
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub similarity_score: f32,
}

/// One participant row of a dinner group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub user_id: UserId,
}
