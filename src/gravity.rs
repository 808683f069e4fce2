//! # Gravity models
//!
//! Earth constants used to initialise and evaluate SGP-4. Each model is a `'static` bundle shared
//! by reference between every element set built against it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Constants of a geopotential model, in the canonical units SGP-4 works with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityModel {
    /// Minutes per canonical time unit.
    pub tumin: f64,
    /// Gravitational parameter, km^3/s^2.
    pub mu: f64,
    /// Equatorial radius, km.
    pub radius: f64,
    /// sqrt(mu) in earth radii^1.5 per minute.
    pub xke: f64,
    pub j2: f64,
    pub j3: f64,
    pub j4: f64,
    pub j3oj2: f64,
}

pub static WGS72_OLD: GravityModel = GravityModel {
    tumin: 13.446839702957643,
    mu: 398600.79964,
    radius: 6378.135,
    xke: 0.0743669161,
    j2: 0.001082616,
    j3: -0.00000253881,
    j4: -0.00000165597,
    j3oj2: -0.002345069720011528,
};

pub static WGS72: GravityModel = GravityModel {
    tumin: 13.446839696959309,
    mu: 398600.8,
    radius: 6378.135,
    xke: 0.07436691613317342,
    j2: 0.001082616,
    j3: -0.00000253881,
    j4: -0.00000165597,
    j3oj2: -0.002345069720011528,
};

pub static WGS84: GravityModel = GravityModel {
    tumin: 13.446851082044981,
    mu: 398600.5,
    radius: 6378.137,
    xke: 0.07436685316871385,
    j2: 0.00108262998905,
    j3: -0.00000253215306,
    j4: -0.00000161098761,
    j3oj2: -0.0023388905587420003,
};

/// Selects the gravity model used by the propagator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GravitationalConstant {
    Wgs72Old,
    Wgs72,
    Wgs84,
}

impl GravitationalConstant {
    pub fn model(self) -> &'static GravityModel {
        use GravitationalConstant::*;

        match self {
            Wgs72Old => &WGS72_OLD,
            Wgs72 => &WGS72,
            Wgs84 => &WGS84,
        }
    }
}

impl Default for GravitationalConstant {
    // Published element sets are fitted against WGS-72.
    fn default() -> Self {
        GravitationalConstant::Wgs72
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use float_cmp::assert_approx_eq;

    #[test]
    fn test_derived_constants_are_consistent() {
        for gc in [
            GravitationalConstant::Wgs72,
            GravitationalConstant::Wgs84,
        ] {
            let g = gc.model();
            let xke = 60.0 / (g.radius.powi(3) / g.mu).sqrt();
            assert_approx_eq!(f64, g.xke, xke, epsilon = 1e-15);
            assert_approx_eq!(f64, g.tumin, 1.0 / g.xke, epsilon = 1e-12);
            assert_approx_eq!(f64, g.j3oj2, g.j3 / g.j2, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_default_is_wgs72() {
        assert_eq!(GravitationalConstant::default().model(), &WGS72);
    }
}
