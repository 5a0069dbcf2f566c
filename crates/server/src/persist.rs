//! Result persistence for one matching run.
//!
//! Translates people-matcher groups and restaurant assignments into
//! store rows and commits them through the store's atomic `persist_run`.
//! Either the whole run is recorded (group rows, member rows, venue
//! assignments, signup and slot status flips) or nothing is.

use crate::config::UnmatchedPolicy;
use match_client::{MatchedGroup, RestaurantMatch};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use store::{
    DinnerGroup, GroupMember, GroupStatus, MatchStore, RestaurantAssignment, StoreError,
    TimeSlotId, UserId,
};
use tracing::{info, warn};

/// What one persist call wrote.
#[derive(Debug, Clone)]
pub struct PersistSummary {
    /// The group rows as persisted (restaurant columns included).
    pub groups: Vec<DinnerGroup>,
    pub members_written: usize,
    pub assignments_written: usize,
    /// Users returned to `pending` under the revert policy.
    pub reverted_users: Vec<UserId>,
}

pub struct ResultPersister {
    store: Arc<MatchStore>,
    policy: UnmatchedPolicy,
}

impl ResultPersister {
    pub fn new(store: Arc<MatchStore>, policy: UnmatchedPolicy) -> Self {
        Self { store, policy }
    }

    /// Persist the output of one run.
    ///
    /// Groups without a restaurant match are persisted venue-less under
    /// `KeepWithoutVenue`, or excluded entirely (members reverted to
    /// `pending`) under `RevertToPending`.
    pub async fn persist(
        &self,
        slot_id: TimeSlotId,
        groups: &[MatchedGroup],
        matches: &[RestaurantMatch],
    ) -> Result<PersistSummary, StoreError> {
        // A user in two groups would double-book a dinner; refuse the
        // whole batch rather than persist an inconsistent run.
        let mut seen_users = HashSet::new();
        for group in groups {
            for user_id in &group.members {
                if !seen_users.insert(*user_id) {
                    return Err(StoreError::InvalidRow {
                        reason: format!("user {user_id} appears in more than one group"),
                    });
                }
            }
        }

        let match_by_group: HashMap<&str, &RestaurantMatch> = matches
            .iter()
            .map(|m| (m.group_id.as_str(), m))
            .collect();

        let mut group_rows = Vec::new();
        let mut member_rows = Vec::new();
        let mut assignments_written = 0;
        let mut reverted_users = Vec::new();

        for group in groups {
            let restaurant = match_by_group.get(group.group_id.as_str());
            if restaurant.is_none() && self.policy == UnmatchedPolicy::RevertToPending {
                warn!(
                    "Group {} found no restaurant; reverting {} members to pending",
                    group.group_id,
                    group.members.len()
                );
                reverted_users.extend(group.members.iter().copied());
                continue;
            }
            if let Some(m) = restaurant {
                assignments_written += 1;
                info!(
                    "Group {} assigned to {} (score {:.2}, {:.1} km)",
                    group.group_id, m.restaurant_name, m.similarity_score, m.distance_km
                );
            } else {
                warn!("Group {} persisted without a venue", group.group_id);
            }

            group_rows.push(DinnerGroup {
                id: group.group_id.clone(),
                time_slot_id: slot_id,
                size: group.size,
                compatibility_score: group.compatibility_score,
                status: GroupStatus::Matched,
                restaurant: restaurant.map(|m| RestaurantAssignment {
                    restaurant_id: m.restaurant_id.clone(),
                    restaurant_name: m.restaurant_name.clone(),
                    similarity_score: m.similarity_score,
                }),
            });
            member_rows.extend(group.members.iter().map(|user_id| GroupMember {
                group_id: group.group_id.clone(),
                user_id: *user_id,
            }));
        }

        let members_written = member_rows.len();
        self.store
            .persist_run(slot_id, group_rows.clone(), member_rows)
            .await?;
        if !reverted_users.is_empty() {
            self.store
                .revert_signups_to_pending(slot_id, &reverted_users)
                .await;
        }
        info!(
            "Persisted {} groups, {} members, {} venue assignments for slot {}",
            group_rows.len(),
            members_written,
            assignments_written,
            slot_id
        );

        Ok(PersistSummary {
            groups: group_rows,
            members_written,
            assignments_written,
            reverted_users,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use store::{Signup, SignupStatus, SlotStatus, TimeSlot};
    use uuid::Uuid;

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
        let mut users = Vec::new();
        for _ in 0..count {
            let user_id = Uuid::new_v4();
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
        store.begin_grouping(slot_id).await.unwrap();
        (slot_id, users)
    }

    fn matched_group(id: &str, members: &[UserId]) -> MatchedGroup {
        MatchedGroup {
            group_id: id.to_string(),
            members: members.to_vec(),
            size: members.len() as u32,
            compatibility_score: 0.85,
        }
    }

    fn restaurant_match(group_id: &str) -> RestaurantMatch {
        RestaurantMatch {
            group_id: group_id.to_string(),
            restaurant_id: "rest-001".to_string(),
            restaurant_name: "Golden Lotus".to_string(),
            similarity_score: 0.91,
            distance_km: 1.6,
            match_reasons: vec![],
        }
    }

    #[tokio::test]
    async fn keep_without_venue_persists_unmatched_groups() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 4).await;
        let groups = vec![
            matched_group("g-1", &users[..2]),
            matched_group("g-2", &users[2..]),
        ];
        let matches = vec![restaurant_match("g-1")];

        let persister = ResultPersister::new(store.clone(), UnmatchedPolicy::KeepWithoutVenue);
        let summary = persister.persist(slot_id, &groups, &matches).await.unwrap();

        assert_eq!(summary.groups.len(), 2);
        assert_eq!(summary.members_written, 4);
        assert_eq!(summary.assignments_written, 1);
        assert!(summary.reverted_users.is_empty());

        let persisted = store.groups_for_slot(slot_id).await;
        let g1 = persisted.iter().find(|g| g.id == "g-1").unwrap();
        let g2 = persisted.iter().find(|g| g.id == "g-2").unwrap();
        assert!(g1.restaurant.is_some());
        assert!(g2.restaurant.is_none());
    }

    #[tokio::test]
    async fn revert_to_pending_excludes_unmatched_groups() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 4).await;
        let groups = vec![
            matched_group("g-1", &users[..2]),
            matched_group("g-2", &users[2..]),
        ];
        let matches = vec![restaurant_match("g-1")];

        let persister = ResultPersister::new(store.clone(), UnmatchedPolicy::RevertToPending);
        let summary = persister.persist(slot_id, &groups, &matches).await.unwrap();

        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.members_written, 2);
        assert_eq!(summary.reverted_users, users[2..].to_vec());

        let persisted = store.groups_for_slot(slot_id).await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, "g-1");
        assert!(store.members_for_group("g-2").await.is_empty());

        // Matched members are grouped, reverted members are pending again.
        assert_eq!(
            store.signup_status(slot_id, users[0]).await,
            Some(SignupStatus::Grouped)
        );
        assert_eq!(
            store.signup_status(slot_id, users[2]).await,
            Some(SignupStatus::Pending)
        );
    }

    #[tokio::test]
    async fn duplicate_member_across_groups_is_refused() {
        let store = Arc::new(MatchStore::new());
        let (slot_id, users) = seed_slot_with_users(&store, 2).await;
        let groups = vec![
            matched_group("g-1", &users),
            matched_group("g-2", &users[..1]),
        ];

        let persister = ResultPersister::new(store.clone(), UnmatchedPolicy::KeepWithoutVenue);
        let err = persister.persist(slot_id, &groups, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRow { .. }));
        assert!(store.groups_for_slot(slot_id).await.is_empty());
    }
}
