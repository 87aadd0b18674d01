/*!
 * Geographic calculations.
 *
 * The map clustering works in raw latitude/longitude degrees treated as a flat plane, which is
 * good enough for grouping markers on screen. The great circle distance is only used to report
 * how far a cluster spreads out.
 */
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/** A latitude/longitude pair in degrees. */
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coord {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coord {
            latitude,
            longitude,
        }
    }

    /// Both components are usable numbers (not NaN or infinite).
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Check if two coordinates are within `eps` degrees of each other in both components.
    pub fn is_close(&self, other: &Coord, eps: f64) -> bool {
        (self.latitude - other.latitude).abs() <= eps
            && (self.longitude - other.longitude).abs() <= eps
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/**
 * Distance between two coordinates treating degrees of latitude and longitude as a flat plane.
 *
 * #Returns
 * The distance in degrees.
 */
pub fn planar_distance(a: Coord, b: Coord) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;

    (dlat * dlat + dlon * dlon).sqrt()
}

/**
 * The simple great circle distance calculation.
 *
 * #Arguments
 * * a - the first point in degrees.
 * * b - the second point in degrees.
 *
 * #Returns
 * The distance between the points in kilometers.
 */
pub fn great_circle_distance(a: Coord, b: Coord) -> f64 {
    const DEG2RAD: f64 = 2.0 * std::f64::consts::PI / 360.0;
    const EARTH_RADIUS_KM: f64 = 6371.0090;

    let lat1_r = a.latitude * DEG2RAD;
    let lon1_r = a.longitude * DEG2RAD;
    let lat2_r = b.latitude * DEG2RAD;
    let lon2_r = b.longitude * DEG2RAD;

    let dlat2 = (lat2_r - lat1_r) / 2.0;
    let dlon2 = (lon2_r - lon1_r) / 2.0;

    let sin2_dlat = f64::powf(f64::sin(dlat2), 2.0);
    let sin2_dlon = f64::powf(f64::sin(dlon2), 2.0);

    let arc = 2.0
        * f64::asin(f64::sqrt(
            sin2_dlat + sin2_dlon * f64::cos(lat1_r) * f64::cos(lat2_r),
        ));

    arc * EARTH_RADIUS_KM
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_planar_distance() {
        let origin = Coord::new(0.0, 0.0);

        assert_eq!(planar_distance(origin, origin), 0.0);
        assert!((planar_distance(origin, Coord::new(3.0, 4.0)) - 5.0).abs() < 1.0e-12);
        assert!((planar_distance(Coord::new(3.0, 4.0), origin) - 5.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_great_circle_distance() {
        // One degree of latitude is about 111.2 km everywhere.
        let d = great_circle_distance(Coord::new(45.0, -120.0), Coord::new(46.0, -120.0));
        assert!((d - 111.19).abs() < 0.1, "{}", d);

        let p = Coord::new(12.5, 77.6);
        assert!(great_circle_distance(p, p) < 1.0e-9);
    }

    #[test]
    fn test_coord_is_close() {
        let left = Coord::new(45.5, -120.0);
        let right = Coord::new(45.5000002, -120.0000002);

        assert!(left.is_close(&left, 1.0e-6));
        assert!(left.is_close(&right, 1.0e-6));
        assert!(!left.is_close(&right, 1.0e-8));
    }

    #[test]
    fn test_coord_is_finite() {
        assert!(Coord::new(0.0, 0.0).is_finite());
        assert!(!Coord::new(f64::NAN, 0.0).is_finite());
        assert!(!Coord::new(0.0, f64::INFINITY).is_finite());
    }
}
