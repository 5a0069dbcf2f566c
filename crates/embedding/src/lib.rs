//! # Embedding Crate
//!
//! Deterministic 768-dim embedding construction for the preference
//! vectorizer.
//!
//! The pipeline needs a well-formed embedding bundle for every user it
//! submits to the preference-processing service, no matter how sparse the
//! stored profile is. This crate owns that construction: seeded base
//! vectors, selective overwrites with real feature values, and the
//! guaranteed default personality embedding.

pub mod builder;

pub use builder::{
    seeded_vector, EmbeddingBuilder, EmbeddingBundle, PERSONALITY_FEATURES, VALUE_MAX, VALUE_MIN,
};
