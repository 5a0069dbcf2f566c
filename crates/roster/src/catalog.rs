//! The restaurant catalog.
//!
//! The source system serves restaurants from a fixed list rather than a
//! live table; this module is that list. Cuisine vectors are built with
//! the deterministic embedding builder so they live in the same space
//! as group preference vectors and are always well-formed.

use crate::geo;
use store::{GeoPoint, Restaurant};

struct CatalogEntry {
    id: &'static str,
    name: &'static str,
    cuisine: &'static str,
    dietary_options: &'static [&'static str],
    price_range: (u32, u32),
    zipcode: &'static str,
    capacity: u32,
    rating: f32,
}

const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        id: "rest-001",
        name: "Golden Lotus",
        cuisine: "thai",
        dietary_options: &["vegetarian", "vegan", "gluten-free"],
        price_range: (20, 35),
        zipcode: "10002",
        capacity: 24,
        rating: 4.5,
    },
    CatalogEntry {
        id: "rest-002",
        name: "Trattoria Lucana",
        cuisine: "italian",
        dietary_options: &["vegetarian", "gluten-free"],
        price_range: (35, 60),
        zipcode: "10014",
        capacity: 18,
        rating: 4.7,
    },
    CatalogEntry {
        id: "rest-003",
        name: "El Fogón",
        cuisine: "mexican",
        dietary_options: &["vegetarian", "vegan"],
        price_range: (15, 30),
        zipcode: "11211",
        capacity: 30,
        rating: 4.3,
    },
    CatalogEntry {
        id: "rest-004",
        name: "Sakura Denchu",
        cuisine: "japanese",
        dietary_options: &["gluten-free", "pescatarian"],
        price_range: (45, 90),
        zipcode: "10019",
        capacity: 14,
        rating: 4.8,
    },
    CatalogEntry {
        id: "rest-005",
        name: "The Copper Pot",
        cuisine: "american",
        dietary_options: &["vegetarian"],
        price_range: (25, 50),
        zipcode: "11215",
        capacity: 40,
        rating: 4.1,
    },
    CatalogEntry {
        id: "rest-006",
        name: "Masala Courtyard",
        cuisine: "indian",
        dietary_options: &["vegetarian", "vegan", "halal"],
        price_range: (20, 40),
        zipcode: "10003",
        capacity: 26,
        rating: 4.6,
    },
    CatalogEntry {
        id: "rest-007",
        name: "Brasserie Voltaire",
        cuisine: "french",
        dietary_options: &["vegetarian"],
        price_range: (55, 110),
        zipcode: "10028",
        capacity: 16,
        rating: 4.4,
    },
    CatalogEntry {
        id: "rest-008",
        name: "Beirut Garden",
        cuisine: "lebanese",
        dietary_options: &["vegetarian", "vegan", "halal", "gluten-free"],
        price_range: (18, 38),
        zipcode: "11201",
        capacity: 22,
        rating: 4.5,
    },
];

/// The full catalog, ready to seed a store or submit to the restaurant
/// matcher.
pub fn default_catalog() -> Vec<Restaurant> {
    ENTRIES
        .iter()
        .map(|entry| Restaurant {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            cuisine_vector: embedding::seeded_vector(&format!(
                "restaurant-cuisine:{}:{}",
                entry.id, entry.cuisine
            )),
            dietary_options: entry
                .dietary_options
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            price_range: entry.price_range,
            location: restaurant_location(entry.zipcode),
            capacity: entry.capacity,
            rating: entry.rating,
        })
        .collect()
}

fn restaurant_location(zipcode: &str) -> GeoPoint {
    geo::locate_zip(zipcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::{VALUE_MAX, VALUE_MIN};
    use std::collections::HashSet;
    use store::types::EMBEDDING_DIM;

    #[test]
    fn catalog_ids_are_unique() {
        let catalog = default_catalog();
        let ids: HashSet<_> = catalog.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn cuisine_vectors_are_well_formed() {
        for restaurant in default_catalog() {
            assert_eq!(restaurant.cuisine_vector.len(), EMBEDDING_DIM);
            for value in &restaurant.cuisine_vector {
                assert!((VALUE_MIN..=VALUE_MAX).contains(value));
            }
        }
    }

    #[test]
    fn catalog_is_deterministic() {
        let first = default_catalog();
        let second = default_catalog();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.cuisine_vector, b.cuisine_vector);
        }
    }
}
