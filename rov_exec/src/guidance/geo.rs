//! # Great circle geometry
//!
//! Spherical earth approximations, good to a fraction of a percent over the distances a rover
//! covers between waypoints.

use serde::{Deserialize, Serialize};
use util::maths::{compass_deg, norm_angle_deg};

/// Mean radius of the earth.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A position on the earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLon {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl LatLon {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }
}

/// Haversine distance between two points.
pub fn haversine_m(a: LatLon, b: LatLon) -> f64 {
    let lat_a = a.lat_deg.to_radians();
    let lat_b = b.lat_deg.to_radians();
    let d_lat = (b.lat_deg - a.lat_deg).to_radians();
    let d_lon = (b.lon_deg - a.lon_deg).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial great circle bearing from `from` to `to`, clockwise from north in [0, 360).
pub fn bearing_deg(from: LatLon, to: LatLon) -> f64 {
    let lat_a = from.lat_deg.to_radians();
    let lat_b = to.lat_deg.to_radians();
    let d_lon = (to.lon_deg - from.lon_deg).to_radians();

    let y = d_lon.sin() * lat_b.cos();
    let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * d_lon.cos();

    compass_deg(y.atan2(x).to_degrees())
}

/// Signed offset of the rover from the direct line to its target.
///
/// Positive when the target is to the right of the rover's heading.
pub fn cross_track_m(distance_m: f64, bearing_deg: f64, heading_deg: f64) -> f64 {
    distance_m * norm_angle_deg(bearing_deg - heading_deg).to_radians().sin()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_haversine() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0001, 0.0);

        assert_eq!(haversine_m(a, a), 0.0);
        assert_eq!(haversine_m(a, b), haversine_m(b, a));
        assert!((haversine_m(a, b) - 11.119).abs() < 0.01);

        let london = LatLon::new(51.5074, -0.1278);
        let paris = LatLon::new(48.8566, 2.3522);
        assert!((haversine_m(london, paris) - 343_500.0).abs() < 1000.0);
        assert_eq!(haversine_m(london, paris), haversine_m(paris, london));
    }

    #[test]
    fn test_bearing() {
        let o = LatLon::new(0.0, 0.0);

        assert_eq!(bearing_deg(o, LatLon::new(0.0001, 0.0)), 0.0);
        assert!((bearing_deg(o, LatLon::new(0.0, 0.0001)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(o, LatLon::new(-0.0001, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(o, LatLon::new(0.0, -0.0001)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_track() {
        // Target straight ahead
        assert!(cross_track_m(10.0, 0.0, 0.0).abs() < 1e-12);

        // Target 90 degrees to the right
        assert!((cross_track_m(10.0, 90.0, 0.0) - 10.0).abs() < 1e-9);

        // Heading wraps through north
        assert!((cross_track_m(10.0, 10.0, 350.0) - 10.0 * 20f64.to_radians().sin()).abs() < 1e-9);
    }
}
