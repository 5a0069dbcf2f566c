//! The in-memory relational store backing the matching pipeline.
//!
//! `MatchStore` stands in for the managed Postgres instance: it holds
//! time slots, signups, user profiles, the restaurant catalog, and the
//! dinner groups written by completed matching runs. All tables live
//! behind one `RwLock` so the grouping claim and the final persist are
//! atomic with respect to concurrent runs.

use crate::error::{Result, StoreError};
use crate::types::{
    DinnerGroup, GroupId, GroupMember, Restaurant, SignupStatus, SlotStatus, Signup, TimeSlot,
    TimeSlotId, UserId, UserProfile,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    time_slots: HashMap<TimeSlotId, TimeSlot>,
    /// Signups per slot, in insertion order.
    signups: HashMap<TimeSlotId, Vec<Signup>>,
    profiles: HashMap<UserId, UserProfile>,
    restaurants: Vec<Restaurant>,
    groups: HashMap<TimeSlotId, Vec<DinnerGroup>>,
    members: HashMap<GroupId, Vec<GroupMember>>,
    /// Slots with a matching run in flight. Guards against two runs
    /// passing the "no groups yet" precondition at the same time.
    grouping_in_progress: HashSet<TimeSlotId>,
}

/// Shared store handle. Cheap to clone behind an `Arc`; every method
/// takes `&self`.
#[derive(Debug, Default)]
pub struct MatchStore {
    tables: RwLock<Tables>,
}

impl MatchStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Writes used by seeding and the booking subsystem
    // -------------------------------------------------------------------------

    pub async fn insert_time_slot(&self, slot: TimeSlot) {
        let mut tables = self.tables.write().await;
        tables.time_slots.insert(slot.id, slot);
    }

    pub async fn insert_profile(&self, profile: UserProfile) {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.user_id, profile);
    }

    pub async fn set_restaurants(&self, restaurants: Vec<Restaurant>) {
        let mut tables = self.tables.write().await;
        tables.restaurants = restaurants;
    }

    /// Insert a signup, enforcing the one-active-signup-per-(user, slot)
    /// invariant and bumping the slot's signup count.
    pub async fn insert_signup(&self, signup: Signup) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.time_slots.get(&signup.time_slot_id) {
            None => return Err(StoreError::SlotNotFound(signup.time_slot_id)),
            // Grouped slots are immutable; no further signups.
            Some(slot) if slot.status != SlotStatus::Open => {
                return Err(StoreError::SlotNotOpen(signup.time_slot_id));
            }
            Some(_) => {}
        }
        let existing = tables.signups.entry(signup.time_slot_id).or_default();
        if existing
            .iter()
            .any(|s| s.user_id == signup.user_id && s.status.is_active())
        {
            return Err(StoreError::DuplicateSignup {
                user_id: signup.user_id,
                time_slot_id: signup.time_slot_id,
            });
        }
        existing.push(signup.clone());
        if let Some(slot) = tables.time_slots.get_mut(&signup.time_slot_id) {
            slot.signup_count += 1;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads used by the pipeline
    // -------------------------------------------------------------------------

    pub async fn time_slot(&self, id: TimeSlotId) -> Option<TimeSlot> {
        self.tables.read().await.time_slots.get(&id).cloned()
    }

    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile> {
        self.tables
            .read()
            .await
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::UserNotFound(user_id))
    }

    /// All confirmed signups for a slot, in signup order.
    pub async fn confirmed_user_ids(&self, slot_id: TimeSlotId) -> Result<Vec<UserId>> {
        let tables = self.tables.read().await;
        if !tables.time_slots.contains_key(&slot_id) {
            return Err(StoreError::SlotNotFound(slot_id));
        }
        Ok(tables
            .signups
            .get(&slot_id)
            .map(|signups| {
                signups
                    .iter()
                    .filter(|s| s.status == SignupStatus::Confirmed)
                    .map(|s| s.user_id)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Dietary restrictions recorded on a user's signup for the slot.
    pub async fn signup_dietary(&self, slot_id: TimeSlotId, user_id: UserId) -> Vec<String> {
        let tables = self.tables.read().await;
        tables
            .signups
            .get(&slot_id)
            .and_then(|signups| signups.iter().find(|s| s.user_id == user_id))
            .map(|s| s.dietary_restrictions.clone())
            .unwrap_or_default()
    }

    pub async fn signup_status(&self, slot_id: TimeSlotId, user_id: UserId) -> Option<SignupStatus> {
        let tables = self.tables.read().await;
        tables
            .signups
            .get(&slot_id)
            .and_then(|signups| signups.iter().find(|s| s.user_id == user_id))
            .map(|s| s.status)
    }

    pub async fn restaurants(&self) -> Vec<Restaurant> {
        self.tables.read().await.restaurants.clone()
    }

    pub async fn groups_for_slot(&self, slot_id: TimeSlotId) -> Vec<DinnerGroup> {
        self.tables
            .read()
            .await
            .groups
            .get(&slot_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn members_for_group(&self, group_id: &str) -> Vec<GroupMember> {
        self.tables
            .read()
            .await
            .members
            .get(group_id)
            .cloned()
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Grouping claim and persist
    // -------------------------------------------------------------------------

    /// Atomically claim a slot for one matching run.
    ///
    /// Under a single write lock this verifies the slot exists, has no
    /// persisted groups, and has no other run in flight, then records
    /// the claim. Two concurrent runs for the same slot cannot both
    /// pass this gate.
    pub async fn begin_grouping(&self, slot_id: TimeSlotId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.time_slots.contains_key(&slot_id) {
            return Err(StoreError::SlotNotFound(slot_id));
        }
        if tables.groups.get(&slot_id).is_some_and(|g| !g.is_empty()) {
            return Err(StoreError::AlreadyGrouped(slot_id));
        }
        if !tables.grouping_in_progress.insert(slot_id) {
            return Err(StoreError::GroupingInProgress(slot_id));
        }
        Ok(())
    }

    /// Release the grouping claim after a failed run so the slot can be
    /// re-triggered.
    pub async fn abort_grouping(&self, slot_id: TimeSlotId) {
        let mut tables = self.tables.write().await;
        tables.grouping_in_progress.remove(&slot_id);
    }

    /// Commit the output of one matching run, all-or-nothing.
    ///
    /// Validates every row first; only if the whole batch is consistent
    /// are the group and member rows inserted, the matched users'
    /// signups flipped to `Grouped`, the slot marked `Grouped`, and the
    /// claim released. A validation failure writes nothing and leaves
    /// the claim held (callers release it via `abort_grouping`).
    pub async fn persist_run(
        &self,
        slot_id: TimeSlotId,
        groups: Vec<DinnerGroup>,
        members: Vec<GroupMember>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.time_slots.contains_key(&slot_id) {
            return Err(StoreError::SlotNotFound(slot_id));
        }
        if tables.groups.get(&slot_id).is_some_and(|g| !g.is_empty()) {
            return Err(StoreError::AlreadyGrouped(slot_id));
        }

        // Validation pass: every row must be consistent before any write.
        let mut members_by_group: HashMap<&str, Vec<&GroupMember>> = HashMap::new();
        for member in &members {
            members_by_group
                .entry(member.group_id.as_str())
                .or_default()
                .push(member);
        }
        for group in &groups {
            if group.time_slot_id != slot_id {
                return Err(StoreError::InvalidRow {
                    reason: format!("group {} references a different time slot", group.id),
                });
            }
            let member_count = members_by_group
                .get(group.id.as_str())
                .map(|m| m.len())
                .unwrap_or(0);
            if member_count != group.size as usize {
                return Err(StoreError::InvalidRow {
                    reason: format!(
                        "group {} declares size {} but has {} member rows",
                        group.id, group.size, member_count
                    ),
                });
            }
        }
        let group_ids: HashSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        for member in &members {
            if !group_ids.contains(member.group_id.as_str()) {
                return Err(StoreError::InvalidRow {
                    reason: format!("member row references unknown group {}", member.group_id),
                });
            }
            let has_confirmed_signup = tables
                .signups
                .get(&slot_id)
                .is_some_and(|signups| {
                    signups
                        .iter()
                        .any(|s| s.user_id == member.user_id && s.status == SignupStatus::Confirmed)
                });
            if !has_confirmed_signup {
                return Err(StoreError::InvalidRow {
                    reason: format!(
                        "member {} of group {} has no confirmed signup for the slot",
                        member.user_id, member.group_id
                    ),
                });
            }
        }

        // Commit pass.
        let grouped_users: HashSet<UserId> = members.iter().map(|m| m.user_id).collect();
        for member in members {
            tables
                .members
                .entry(member.group_id.clone())
                .or_default()
                .push(member);
        }
        tables.groups.insert(slot_id, groups);
        if let Some(signups) = tables.signups.get_mut(&slot_id) {
            for signup in signups.iter_mut() {
                if grouped_users.contains(&signup.user_id)
                    && signup.status == SignupStatus::Confirmed
                {
                    signup.status = SignupStatus::Grouped;
                }
            }
        }
        if let Some(slot) = tables.time_slots.get_mut(&slot_id) {
            slot.status = SlotStatus::Grouped;
        }
        tables.grouping_in_progress.remove(&slot_id);
        Ok(())
    }

    /// Revert a set of users' signups to `Pending` (unmatched-group
    /// policy `RevertToPending`).
    pub async fn revert_signups_to_pending(&self, slot_id: TimeSlotId, user_ids: &[UserId]) {
        let mut tables = self.tables.write().await;
        let targets: HashSet<&UserId> = user_ids.iter().collect();
        if let Some(signups) = tables.signups.get_mut(&slot_id) {
            for signup in signups.iter_mut() {
                if targets.contains(&signup.user_id) && signup.status == SignupStatus::Confirmed {
                    signup.status = SignupStatus::Pending;
                }
            }
        }
    }

    /// Row counts for debugging and seed validation:
    /// (time slots, signups, profiles, groups, members).
    pub async fn counts(&self) -> (usize, usize, usize, usize, usize) {
        let tables = self.tables.read().await;
        (
            tables.time_slots.len(),
            tables.signups.values().map(|v| v.len()).sum(),
            tables.profiles.len(),
            tables.groups.values().map(|v| v.len()).sum(),
            tables.members.values().map(|v| v.len()).sum(),
        )
    }
}
