//! Deterministic embedding construction for the preference vectorizer.
//!
//! The external preference-processing service expects a fixed-schema
//! bundle of named 768-dim embeddings per user, but stored profiles are
//! sparse. The builder bridges the gap: every embedding starts from a
//! seeded sinusoidal base vector (so it is always well-formed, even for
//! near-empty profiles) and real feature values are then written over
//! specific indices. The downstream matcher treats missing or zeroed
//! vectors as a hard failure, so the base vector is never all-zero and
//! every value stays inside [`VALUE_MIN`, `VALUE_MAX`].

use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use store::types::EMBEDDING_DIM;
use store::{UserId, UserProfile};

/// Lower bound for every generated embedding value.
pub const VALUE_MIN: f32 = 0.05;
/// Upper bound for every generated embedding value.
pub const VALUE_MAX: f32 = 0.95;

/// Per-index phase step of the sinusoidal expansion. Fixed so the same
/// seed always expands to the same vector.
const PHASE_STEP: f32 = 0.037;

/// The five personality scalars backing the default embedding, in the
/// order they are written into indices 0..5.
pub const PERSONALITY_FEATURES: [&str; 5] = [
    "social_level",
    "openness",
    "conscientiousness",
    "extraversion",
    "agreeableness",
];

/// Named embeddings for one user, ready to submit to the
/// preference-processing service.
///
/// `BTreeMap` keeps attribute order deterministic.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingBundle {
    pub user_id: UserId,
    pub embeddings: BTreeMap<String, Vec<f32>>,
}

/// Builds embedding bundles from stored profiles.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingBuilder;

impl EmbeddingBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build bundles for a batch of profiles in parallel.
    ///
    /// Construction is pure CPU work and each profile is independent,
    /// so the batch runs on the rayon pool. Output order matches input
    /// order; callers downstream key results by user id regardless.
    pub fn build_bundles(&self, profiles: &[UserProfile]) -> Vec<EmbeddingBundle> {
        profiles
            .par_iter()
            .map(|profile| self.build_bundle(profile))
            .collect()
    }

    /// Build the embedding bundle for a single profile.
    ///
    /// One embedding is emitted per populated attribute family
    /// (cuisine, location, personality). A profile with no usable
    /// signal at all still yields the default personality embedding,
    /// so the bundle is never empty.
    pub fn build_bundle(&self, profile: &UserProfile) -> EmbeddingBundle {
        let mut embeddings = BTreeMap::new();

        if !profile.cuisine_preferences.is_empty() {
            embeddings.insert(
                "cuisine".to_string(),
                self.cuisine_embedding(profile),
            );
        }
        if !profile.zipcode.is_empty() {
            embeddings.insert(
                "location".to_string(),
                self.location_embedding(profile),
            );
        }
        let has_personality = PERSONALITY_FEATURES
            .iter()
            .any(|key| profile.features.contains_key(*key));
        if has_personality || embeddings.is_empty() {
            embeddings.insert(
                "personality".to_string(),
                self.personality_embedding(profile),
            );
        }

        EmbeddingBundle {
            user_id: profile.user_id,
            embeddings,
        }
    }

    /// Cuisine embedding: seeded base vector with each preferred
    /// cuisine's affinity written at an index derived from the cuisine
    /// name. Affinity falls back to 0.9 for cuisines the user listed
    /// but has no stored affinity score for.
    fn cuisine_embedding(&self, profile: &UserProfile) -> Vec<f32> {
        let mut vector = seeded_vector(&format!("cuisine:{}", profile.user_id));
        for cuisine in &profile.cuisine_preferences {
            let affinity = profile
                .features
                .get(&format!("cuisine_affinity:{cuisine}"))
                .copied()
                .unwrap_or(0.9);
            vector[stable_index(cuisine)] = clamp_value(affinity);
        }
        vector
    }

    /// Location embedding: seeded base vector with a normalized zip
    /// signal written at index 0.
    fn location_embedding(&self, profile: &UserProfile) -> Vec<f32> {
        let mut vector = seeded_vector(&format!("location:{}", profile.user_id));
        let digits: String = profile.zipcode.chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(zip) = digits.parse::<u32>() {
            vector[0] = clamp_value(zip as f32 / 99_999.0);
        }
        vector
    }

    /// Personality embedding: seeded base vector with the five
    /// personality scalars written at indices 0..5, each defaulting to
    /// the midpoint (0.5) when absent from the profile.
    fn personality_embedding(&self, profile: &UserProfile) -> Vec<f32> {
        let mut vector = seeded_vector(&format!("personality:{}", profile.user_id));
        for (i, key) in PERSONALITY_FEATURES.iter().enumerate() {
            let value = profile.features.get(*key).copied().unwrap_or(0.5);
            vector[i] = clamp_value(value);
        }
        vector
    }
}

/// Expand a string seed into a smooth 768-length vector.
///
/// ## Algorithm
/// 1. SHA-256 the seed and map the first 8 bytes to a base scalar in [0, 1)
/// 2. v[i] = 0.5 + 0.45 * sin(tau * base + i * PHASE_STEP)
///
/// The amplitude keeps the wave inside [`VALUE_MIN`, `VALUE_MAX`], and
/// SHA-256 makes the result stable across runs and platforms.
pub fn seeded_vector(seed: &str) -> Vec<f32> {
    let base = seed_scalar(seed);
    (0..EMBEDDING_DIM)
        .map(|i| {
            // Clamp guards the bound against f32 rounding at the wave's
            // extremes.
            clamp_value(0.5 + 0.45 * (std::f32::consts::TAU * base + i as f32 * PHASE_STEP).sin())
        })
        .collect()
}

/// Hash a string seed to a scalar in [0, 1).
fn seed_scalar(seed: &str) -> f32 {
    let digest = Sha256::digest(seed.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) as f64 / (u64::MAX as f64 + 1.0)) as f32
}

/// Map an attribute name to a stable overwrite index.
fn stable_index(name: &str) -> usize {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) % EMBEDDING_DIM as u64) as usize
}

/// Clamp a real feature value into the embedding bounds. Non-finite
/// inputs collapse to the midpoint rather than poisoning the vector.
fn clamp_value(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(VALUE_MIN, VALUE_MAX)
    } else {
        0.5
    }
}
