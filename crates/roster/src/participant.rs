//! Roster loading and participant context assembly.
//!
//! This module aggregates everything the people matcher needs to know
//! about one confirmed attendee into a `Participant`: dietary
//! restrictions (union of profile and signup data), the coarse budget
//! tier, and resolved coordinates.

use crate::error::{Result, RosterError};
use crate::geo;
use serde::Serialize;
use store::{BudgetTier, GeoPoint, MatchStore, StoreError, TimeSlotId, UserId};
use tracing::debug;

/// Minimum confirmed signups before a matching run is allowed. Below
/// this the people matcher cannot form statistically meaningful
/// compatibility groups.
pub const MIN_PARTICIPANTS: usize = 12;

/// One confirmed attendee, assembled for the matching pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub user_id: UserId,
    pub name: String,
    pub dietary_restrictions: Vec<String>,
    pub budget: BudgetTier,
    pub location: GeoPoint,
}

/// Load the confirmed roster for a time slot, enforcing the minimum
/// headcount.
///
/// # Returns
/// Confirmed user ids in signup order, or `InsufficientSignups` when
/// the slot is below `required`.
pub async fn load_roster(
    store: &MatchStore,
    slot_id: TimeSlotId,
    required: usize,
) -> Result<Vec<UserId>> {
    let roster = store.confirmed_user_ids(slot_id).await.map_err(|e| match e {
        StoreError::SlotNotFound(id) => RosterError::SlotNotFound(id),
        other => RosterError::Store(other),
    })?;
    debug!(
        "Loaded roster for slot {}: {} confirmed signups",
        slot_id,
        roster.len()
    );
    if roster.len() < required {
        return Err(RosterError::InsufficientSignups {
            time_slot_id: slot_id,
            found: roster.len(),
            required,
        });
    }
    Ok(roster)
}

/// Build the matcher-facing context for one roster member.
///
/// Dietary restrictions are the union of what the profile stores and
/// what the user declared on this particular signup; the budget tier is
/// bucketed from the profile's price ceiling.
pub async fn build_participant(
    store: &MatchStore,
    slot_id: TimeSlotId,
    user_id: UserId,
) -> Result<Participant> {
    let profile = store.profile(user_id).await.map_err(|e| match e {
        StoreError::UserNotFound(id) => RosterError::ProfileMissing(id),
        other => RosterError::Store(other),
    })?;

    let mut dietary = profile.dietary_restrictions.clone();
    for restriction in store.signup_dietary(slot_id, user_id).await {
        if !dietary.contains(&restriction) {
            dietary.push(restriction);
        }
    }

    Ok(Participant {
        user_id,
        name: profile.name.clone(),
        dietary_restrictions: dietary,
        budget: BudgetTier::from_price_ceiling(profile.price_range.1),
        location: geo::locate_zip(&profile.zipcode),
    })
}
