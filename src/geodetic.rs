//! Geodetic latitude, longitude and height above a reference ellipsoid, from Earth-fixed
//! (ITRS) coordinates and back.

use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::kilometer,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const LATITUDE_TOLERANCE: f64 = 1e-12;
const MAX_ITERATIONS: usize = 10;

/// A reference ellipsoid. Radius in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipsoid {
    pub radius: f64,
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        radius: 6378.137,
        inverse_flattening: 298.257223563,
    };

    pub const WGS72: Ellipsoid = Ellipsoid {
        radius: 6378.135,
        inverse_flattening: 298.26,
    };

    pub fn flattening(&self) -> f64 {
        1.0 / self.inverse_flattening
    }

    /// First eccentricity squared.
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }

    /// Radius of curvature in the prime vertical at a geodetic latitude.
    fn prime_vertical_radius(&self, sin_lat: f64) -> f64 {
        self.radius / (1.0 - self.eccentricity_squared() * sin_lat * sin_lat).sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeodeticPosition {
    pub latitude: Angle,
    /// East positive, in (-pi, pi].
    pub longitude: Angle,
    pub height: Length,
}

/// Convert an Earth-fixed position in kilometers to geodetic coordinates.
pub fn to_geodetic(position: [f64; 3], ellipsoid: &Ellipsoid) -> GeodeticPosition {
    let [x, y, z] = position;
    let e2 = ellipsoid.eccentricity_squared();
    let p = x.hypot(y);
    let longitude = y.atan2(x);

    let mut latitude = z.atan2(p * (1.0 - e2));
    let mut c = ellipsoid.prime_vertical_radius(latitude.sin());
    for _ in 0..MAX_ITERATIONS {
        let sin_lat = latitude.sin();
        c = ellipsoid.prime_vertical_radius(sin_lat);
        let next = (z + c * e2 * sin_lat).atan2(p);
        let delta = (next - latitude).abs();
        latitude = next;
        if delta < LATITUDE_TOLERANCE {
            break;
        }
    }

    // Near the poles cos(latitude) vanishes and the height is better taken from z.
    let height = if latitude.cos().abs() > 1e-3 {
        p / latitude.cos() - c
    } else {
        z / latitude.sin() - c * (1.0 - e2)
    };

    GeodeticPosition {
        latitude: Angle::new::<radian>(latitude),
        longitude: Angle::new::<radian>(longitude),
        height: Length::new::<kilometer>(height),
    }
}

/// Convert geodetic coordinates to an Earth-fixed position in kilometers.
pub fn to_cartesian(geodetic: &GeodeticPosition, ellipsoid: &Ellipsoid) -> [f64; 3] {
    let (sin_lat, cos_lat) = geodetic.latitude.get::<radian>().sin_cos();
    let (sin_lon, cos_lon) = geodetic.longitude.get::<radian>().sin_cos();
    let h = geodetic.height.get::<kilometer>();
    let c = ellipsoid.prime_vertical_radius(sin_lat);
    let s = c * (1.0 - ellipsoid.eccentricity_squared());
    [
        (c + h) * cos_lat * cos_lon,
        (c + h) * cos_lat * sin_lon,
        (s + h) * sin_lat,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use float_cmp::assert_approx_eq;
    use uom::si::angle::degree;

    fn geodetic(lat: f64, lon: f64, height: f64) -> GeodeticPosition {
        GeodeticPosition {
            latitude: Angle::new::<degree>(lat),
            longitude: Angle::new::<degree>(lon),
            height: Length::new::<kilometer>(height),
        }
    }

    #[test]
    fn test_equator_prime_meridian() {
        let g = to_geodetic([6378.137 + 400.0, 0.0, 0.0], &Ellipsoid::WGS84);
        assert_approx_eq!(f64, g.latitude.get::<degree>(), 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, g.longitude.get::<degree>(), 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, g.height.get::<kilometer>(), 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_north_pole() {
        let polar_radius = 6378.137 * (1.0 - 1.0 / 298.257223563);
        let g = to_geodetic([0.0, 0.0, polar_radius + 10.0], &Ellipsoid::WGS84);
        assert_approx_eq!(f64, g.latitude.get::<degree>(), 90.0, epsilon = 1e-9);
        assert_approx_eq!(f64, g.height.get::<kilometer>(), 10.0, epsilon = 1e-8);
    }

    #[test]
    fn test_round_trip() {
        for ellipsoid in [Ellipsoid::WGS84, Ellipsoid::WGS72] {
            for (lat, lon, h) in [
                (51.6, -122.3, 420.0),
                (-33.9, 151.2, 0.0),
                (89.99, 10.0, 35786.0),
                (-45.0, 179.5, 1200.0),
            ] {
                let start = geodetic(lat, lon, h);
                let back = to_geodetic(to_cartesian(&start, &ellipsoid), &ellipsoid);
                assert_approx_eq!(f64, back.latitude.get::<degree>(), lat, epsilon = 1e-9);
                assert_approx_eq!(f64, back.longitude.get::<degree>(), lon, epsilon = 1e-9);
                assert_approx_eq!(f64, back.height.get::<kilometer>(), h, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_ellipsoids_differ() {
        let r = [4000.0, 3000.0, 4500.0];
        let a = to_geodetic(r, &Ellipsoid::WGS84);
        let b = to_geodetic(r, &Ellipsoid::WGS72);
        assert!((a.height - b.height).get::<kilometer>().abs() > 1e-4);
        assert_eq!(Ellipsoid::default(), Ellipsoid::WGS84);
    }
}
