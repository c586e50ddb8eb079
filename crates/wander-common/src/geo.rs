//! Geospatial helpers

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Haversine distance between two points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    haversine_m(lat1, lng1, lat2, lng2) / 1000.0
}

pub fn is_within_radius(lat1: f64, lng1: f64, lat2: f64, lng2: f64, radius_m: f64) -> bool {
    haversine_m(lat1, lng1, lat2, lng2) <= radius_m
}

/// Clamp latitude to [-90, 90] and wrap longitude into [-180, 180).
pub fn normalize_coordinates(lat: f64, lng: f64) -> (f64, f64) {
    let lat = lat.clamp(-90.0, 90.0);
    let lng = ((lng + 180.0).rem_euclid(360.0)) - 180.0;
    (lat, lng)
}
