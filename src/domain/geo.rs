use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance in kilometers, haversine form.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISBON: Coordinate = Coordinate { lat: 38.7223, lon: -9.1393 };
    const PORTO: Coordinate = Coordinate { lat: 41.1579, lon: -8.6291 };

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance_km(LISBON, LISBON), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(distance_km(LISBON, PORTO), distance_km(PORTO, LISBON));
    }

    #[test]
    fn lisbon_to_porto_is_about_274_km() {
        let d = distance_km(LISBON, PORTO);
        assert!((270.0..278.0).contains(&d), "got {d}");
    }

    #[test]
    fn distance_is_non_negative_across_hemispheres() {
        let sydney = Coordinate { lat: -33.8688, lon: 151.2093 };
        assert!(distance_km(LISBON, sydney) > 0.0);
    }
}
