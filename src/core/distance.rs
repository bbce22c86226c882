use geo::{HaversineDistance, Point};
use thiserror::Error;

use crate::models::Location;

/// Coordinates rejected before any distance is computed
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// Check that a latitude/longitude pair is on the globe
#[inline]
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<(), GeoError> {
    if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(GeoError::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

/// Great-circle (haversine) distance between two locations in kilometers
///
/// The points are put in a fixed order before computing so that
/// `distance_km(a, b)` and `distance_km(b, a)` are bit-for-bit equal.
pub fn distance_km(a: &Location, b: &Location) -> Result<f64, GeoError> {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Haversine distance between two raw coordinate pairs in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, GeoError> {
    validate_coordinate(lat1, lon1)?;
    validate_coordinate(lat2, lon2)?;

    let first = Point::new(lon1, lat1);
    let second = Point::new(lon2, lat2);
    let (from, to) = if (lat1, lon1) <= (lat2, lon2) {
        (first, second)
    } else {
        (second, first)
    };

    let meters: f64 = from.haversine_distance(&to);
    Ok((meters / 1000.0).max(0.0))
}
