/// Great-circle distance between two WGS84 points (Haversine), whole kilometres.
///
/// Callers reject out-of-range coordinates before calling.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_KM * c).round()
}

/// Distance when both parties have coordinates
pub fn distance_between(
    from: (Option<f64>, Option<f64>),
    to: (Option<f64>, Option<f64>),
) -> Option<f64> {
    match (from, to) {
        ((Some(lat1), Some(lon1)), (Some(lat2), Some(lon2))) => {
            Some(distance_km(lat1, lon1, lat2, lon2))
        }
        _ => None,
    }
}
