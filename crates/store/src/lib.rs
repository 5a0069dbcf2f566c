//! # Store Crate
//!
//! Domain types and the in-memory relational store for the dinner-matching
//! system.
//!
//! ## Main Components
//!
//! - **types**: Core domain rows (TimeSlot, Signup, UserProfile, Restaurant,
//!   DinnerGroup, GroupMember) and the budget tier bucketing
//! - **store**: `MatchStore`, the lock-guarded table set with the atomic
//!   grouping claim and all-or-nothing run persistence
//! - **error**: Error types for store operations
//!
//! ## Example Usage
//!
//! ```ignore
//! use store::{MatchStore, SignupStatus};
//!
//! let store = MatchStore::new();
//! store.insert_time_slot(slot).await;
//! store.insert_signup(signup).await?;
//!
//! let roster = store.confirmed_user_ids(slot_id).await?;
//! println!("{} confirmed signups", roster.len());
//! ```

// Public modules
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
pub use store::MatchStore;
pub use types::{
    // Type aliases
    GroupId,
    RestaurantId,
    TimeSlotId,
    UserId,
    // Core types
    DinnerGroup,
    GeoPoint,
    GroupMember,
    Restaurant,
    RestaurantAssignment,
    Signup,
    TimeSlot,
    UserProfile,
    // Enums
    BudgetTier,
    GroupStatus,
    SignupStatus,
    SlotStatus,
    // Constants
    EMBEDDING_DIM,
};
