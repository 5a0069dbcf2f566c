//! Wire types for the four scoring services.
//!
//! Field names follow the services' JSON contracts exactly; these
//! structs are the single place where the wire shape is spelled out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use store::{BudgetTier, GeoPoint, Restaurant, UserId};

// =============================================================================
// Preference processing (POST {preference}/process-user)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProcessUserRequest {
    pub user_id: UserId,
    /// Named 768-dim embeddings, e.g. "cuisine" / "personality".
    pub embeddings: BTreeMap<String, Vec<f32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessUserResponse {
    pub preference_vector: Vec<f32>,
}

// =============================================================================
// People matching (POST {people_matcher}/api/v1/match)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest {
    pub participants: Vec<MatchParticipant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchParticipant {
    pub user_id: UserId,
    pub name: String,
    pub dietary_restrictions: Vec<String>,
    pub budget: BudgetTier,
    pub location: GeoPoint,
    pub preference_vector: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchResponse {
    pub groups: Vec<MatchedGroup>,
}

/// One compatibility group returned by the people matcher.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchedGroup {
    pub group_id: String,
    pub members: Vec<UserId>,
    pub size: u32,
    pub compatibility_score: f32,
}

// =============================================================================
// Group aggregation (POST {group_aggregator}/aggregate-group)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AggregateGroupRequest {
    pub group_id: String,
    pub members: Vec<AggregateMember>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateMember {
    pub user_id: UserId,
    pub dietary_restrictions: Vec<String>,
    pub budget: BudgetTier,
    pub preference_vector: Vec<f32>,
}

/// Combined preference/constraint profile for one group. Received from
/// the aggregator and forwarded verbatim to the restaurant matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProfile {
    pub group_id: String,
    pub preference_vector: Vec<f32>,
    pub dietary_restrictions: Vec<String>,
    pub budget: BudgetTier,
}

// =============================================================================
// Restaurant matching (POST {restaurant_matcher}/match-groups)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantMatchRequest {
    pub groups: Vec<GroupProfile>,
    pub restaurants: Vec<Restaurant>,
    pub max_distance_km: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantMatchResponse {
    pub matches: Vec<RestaurantMatch>,
    /// Group ids for which no restaurant satisfied the distance bound.
    pub unmatched_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantMatch {
    pub group_id: String,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub similarity_score: f32,
    pub distance_km: f64,
    #[serde(default)]
    pub match_reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    #[test]
    fn match_participant_serializes_to_the_wire_contract() {
        let participant = MatchParticipant {
            user_id: Uuid::nil(),
            name: "Ada".to_string(),
            dietary_restrictions: vec!["vegan".to_string()],
            budget: BudgetTier::Low,
            location: GeoPoint {
                lat: 40.75,
                lng: -73.99,
            },
            preference_vector: vec![0.5],
        };
        let value = serde_json::to_value(&participant).unwrap();
        assert_eq!(value["budget"], "low");
        assert_eq!(value["location"]["lat"], 40.75);
        assert_eq!(value["dietary_restrictions"][0], "vegan");
    }

    #[test]
    fn restaurant_match_tolerates_missing_reasons() {
        let json = r#"{
            "group_id": "g-1",
            "restaurant_id": "rest-001",
            "restaurant_name": "Golden Lotus",
            "similarity_score": 0.91,
            "distance_km": 1.4
        }"#;
        let parsed: RestaurantMatch = serde_json::from_str(json).unwrap();
        assert!(parsed.match_reasons.is_empty());
    }

    #[test]
    fn process_user_request_keeps_embedding_names_ordered() {
        let mut embeddings = BTreeMap::new();
        embeddings.insert("personality".to_string(), vec![0.5]);
        embeddings.insert("cuisine".to_string(), vec![0.9]);
        let request = ProcessUserRequest {
            user_id: Uuid::nil(),
            embeddings,
        };
        let json = serde_json::to_string(&request).unwrap();
        // BTreeMap order: cuisine before personality, every time.
        assert!(json.find("cuisine").unwrap() < json.find("personality").unwrap());
    }
}
