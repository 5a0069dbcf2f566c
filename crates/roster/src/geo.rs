//! Zip code to coordinate resolution.
//!
//! A deterministic lookup table standing in for a real geocoding
//! service. Unknown zip codes resolve to a fixed fallback coordinate so
//! the people matcher always receives a location.

use store::GeoPoint;

/// Fallback coordinate (lower Manhattan) for zip codes the table
/// doesn't know.
pub const FALLBACK_LOCATION: GeoPoint = GeoPoint {
    lat: 40.7128,
    lng: -74.0060,
};

/// Known zip codes and their centroids.
const ZIP_TABLE: &[(&str, f64, f64)] = &[
    ("10001", 40.7506, -73.9972),
    ("10002", 40.7168, -73.9861),
    ("10003", 40.7318, -73.9892),
    ("10009", 40.7265, -73.9786),
    ("10011", 40.7421, -74.0000),
    ("10012", 40.7255, -73.9983),
    ("10013", 40.7203, -74.0048),
    ("10014", 40.7342, -74.0061),
    ("10016", 40.7459, -73.9777),
    ("10019", 40.7656, -73.9852),
    ("10025", 40.7988, -73.9684),
    ("10028", 40.7764, -73.9536),
    ("11201", 40.6937, -73.9904),
    ("11211", 40.7126, -73.9530),
    ("11215", 40.6625, -73.9866),
    ("11222", 40.7277, -73.9475),
];

/// Resolve a zip code to coordinates.
pub fn locate_zip(zipcode: &str) -> GeoPoint {
    ZIP_TABLE
        .iter()
        .find(|(zip, _, _)| *zip == zipcode.trim())
        .map(|(_, lat, lng)| GeoPoint {
            lat: *lat,
            lng: *lng,
        })
        .unwrap_or(FALLBACK_LOCATION)
}
