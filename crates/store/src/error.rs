//! Error types for the store crate.

use crate::types::{TimeSlotId, UserId};
use thiserror::Error;

/// Errors that can occur while reading from or writing to the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Referenced time slot doesn't exist
    #[error("Time slot {0} not found")]
    SlotNotFound(TimeSlotId),

    /// Referenced user has no stored profile
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The slot already has persisted dinner groups; a second matching
    /// run must not double-write
    #[error("Time slot {0} already has dinner groups")]
    AlreadyGrouped(TimeSlotId),

    /// Another matching run currently holds the grouping claim for the slot
    #[error("A matching run is already in progress for time slot {0}")]
    GroupingInProgress(TimeSlotId),

    /// The slot no longer accepts signups (grouped or cancelled)
    #[error("Time slot {0} is not open for signups")]
    SlotNotOpen(TimeSlotId),

    /// A user already has an active signup for the slot
    #[error("User {user_id} already has an active signup for time slot {time_slot_id}")]
    DuplicateSignup {
        user_id: UserId,
        time_slot_id: TimeSlotId,
    },

    /// A row in a persist batch failed validation; nothing was written
    #[error("Invalid row in persist batch: {reason}")]
    InvalidRow { reason: String },
}

/// Convenience type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, StoreError>;
