//! Coordinate conversions on the WGS84 ellipsoid.
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Mean earth radius used for great-circle distances, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const HEIGHT_TOLERANCE: f64 = 1.0e-6;
const MAX_ITERATIONS: usize = 100;

/// Latitude and longitude in decimal degrees, height in meters above the ellipsoid.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Geodetic {
    pub lat: f64,
    pub lon: f64,
    pub height: f64,
}

impl Geodetic {
    /// True for the all-zero value returned when nothing could be decoded.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0 && self.height == 0.0
    }
}

/// Convert earth-centered, earth-fixed coordinates (meters) to geodetic coordinates.
///
/// Latitude and height are refined iteratively until consecutive height estimates agree
/// to within a micrometer. The origin has no meaningful geodetic position and maps to
/// the all-zero [Geodetic].
#[must_use]
pub fn ecef_to_geodetic(x: f64, y: f64, z: f64) -> Geodetic {
    if x == 0.0 && y == 0.0 && z == 0.0 {
        return Geodetic::default();
    }
    let a = WGS84_A;
    let b = a - WGS84_F * a;
    let e2 = (a * a - b * b) / (a * a);

    let lon = y.atan2(x);
    let p = x.hypot(y);

    // prime vertical radius of curvature and height for a latitude estimate
    let solve = |theta: f64| {
        let (sn, cs) = theta.sin_cos();
        let n = a * a / ((a * cs).powi(2) + (b * sn).powi(2)).sqrt();
        (n, p / cs - n)
    };

    let mut theta = z.atan2(p * (1.0 - e2));
    let (mut n, mut h) = solve(theta);
    let mut h_prev = 0.0;
    let mut rounds = 0;
    while (h - h_prev).abs() > HEIGHT_TOLERANCE && rounds < MAX_ITERATIONS {
        h_prev = h;
        theta = z.atan2(p * (1.0 - e2 * n / (n + h)));
        (n, h) = solve(theta);
        rounds += 1;
    }

    Geodetic {
        lat: theta.to_degrees(),
        lon: lon.to_degrees(),
        height: h,
    }
}

/// Great-circle distance in kilometers between two points given in decimal degrees.
#[must_use]
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_KM
}
