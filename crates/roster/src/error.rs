//! Error types for roster loading and participant assembly.

use store::{StoreError, TimeSlotId, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    /// Referenced time slot doesn't exist
    #[error("Time slot {0} not found")]
    SlotNotFound(TimeSlotId),

    /// The slot has fewer confirmed signups than the matcher needs to
    /// form statistically meaningful groups
    #[error("Time slot {time_slot_id} has {found} confirmed signups, {required} required")]
    InsufficientSignups {
        time_slot_id: TimeSlotId,
        found: usize,
        required: usize,
    },

    /// A roster member has no stored profile
    #[error("No profile stored for user {0}")]
    ProfileMissing(UserId),

    /// Underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RosterError>;
