//! Demo dataset seeding for local runs and the CLI.

use crate::catalog;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use store::{
    MatchStore, Signup, SignupStatus, SlotStatus, TimeSlot, TimeSlotId, UserId, UserProfile,
};
use uuid::Uuid;

const DEMO_NAMES: [&str; 12] = [
    "Ada", "Bruno", "Carmen", "Dmitri", "Esther", "Farid", "Greta", "Hiro", "Imani", "Jonas",
    "Keiko", "Luca",
];

const DEMO_CUISINES: [&str; 4] = ["thai", "italian", "mexican", "japanese"];

const DEMO_ZIPS: [&str; 4] = ["10001", "10011", "11211", "11215"];

/// Seed one open time slot with twelve confirmed, fully-profiled users
/// and the default restaurant catalog.
///
/// # Returns
/// The seeded slot id and its roster, for driving a matching run.
pub async fn seed_demo(store: &MatchStore) -> (TimeSlotId, Vec<UserId>) {
    let slot = TimeSlot {
        id: Uuid::new_v4(),
        starts_at: Utc::now() + Duration::days(3),
        city: "New York".to_string(),
        status: SlotStatus::Open,
        signup_count: 0,
        max_signups: 40,
    };
    let slot_id = slot.id;
    store.insert_time_slot(slot).await;
    store.set_restaurants(catalog::default_catalog()).await;

    let mut roster = Vec::with_capacity(DEMO_NAMES.len());
    for (i, name) in DEMO_NAMES.iter().enumerate() {
        let user_id = Uuid::new_v4();
        let mut features = HashMap::new();
        features.insert("social_level".to_string(), 0.3 + 0.05 * i as f32);
        features.insert("openness".to_string(), 0.4 + 0.04 * i as f32);
        features.insert("extraversion".to_string(), 0.35 + 0.045 * i as f32);

        store
            .insert_profile(UserProfile {
                user_id,
                name: (*name).to_string(),
                zipcode: DEMO_ZIPS[i % DEMO_ZIPS.len()].to_string(),
                cuisine_preferences: vec![
                    DEMO_CUISINES[i % DEMO_CUISINES.len()].to_string(),
                    DEMO_CUISINES[(i + 1) % DEMO_CUISINES.len()].to_string(),
                ],
                dietary_restrictions: if i % 4 == 0 {
                    vec!["vegetarian".to_string()]
                } else {
                    vec![]
                },
                price_range: (15 + 5 * (i as u32 % 3), 30 + 15 * (i as u32 % 3)),
                features,
            })
            .await;

        // Seeded signups are always valid; the insert cannot conflict.
        let _ = store
            .insert_signup(Signup {
                user_id,
                time_slot_id: slot_id,
                status: SignupStatus::Confirmed,
                dietary_restrictions: vec![],
            })
            .await;
        roster.push(user_id);
    }

    (slot_id, roster)
}
