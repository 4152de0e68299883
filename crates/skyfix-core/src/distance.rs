use serde::{Deserialize, Serialize};

use crate::types::{GeoCoordinate, EARTH_RADIUS_M};

/// Great-circle distance between two coordinates in metres (haversine).
pub fn haversine_m(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Localization error against a ground-truth coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoError {
    /// `truth.latitude - computed.latitude`, degrees.
    pub latitude_delta: f64,
    /// `truth.longitude - computed.longitude`, degrees.
    pub longitude_delta: f64,
    /// Great-circle distance, metres.
    pub distance_m: f64,
}

impl GeoError {
    pub fn between(truth: GeoCoordinate, computed: GeoCoordinate) -> Self {
        Self {
            latitude_delta: truth.latitude - computed.latitude,
            longitude_delta: truth.longitude - computed.longitude,
            distance_m: haversine_m(truth, computed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identical_points_are_zero_apart() {
        let p = GeoCoordinate::new(60.5, 22.3);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = haversine_m(GeoCoordinate::new(0.0, 0.0), GeoCoordinate::new(0.0, 1.0));
        assert_abs_diff_eq!(d, 111_319.49, epsilon = 1.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoCoordinate::new(60.50, 22.30);
        let b = GeoCoordinate::new(60.51, 22.32);
        assert_abs_diff_eq!(haversine_m(a, b), haversine_m(b, a), epsilon = 1e-9);
    }

    #[test]
    fn error_deltas_are_truth_minus_computed() {
        let truth = GeoCoordinate::new(10.0, 20.0);
        let computed = GeoCoordinate::new(9.5, 20.25);
        let err = GeoError::between(truth, computed);
        assert_abs_diff_eq!(err.latitude_delta, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(err.longitude_delta, -0.25, epsilon = 1e-12);
        assert!(err.distance_m > 0.0);
    }
}
