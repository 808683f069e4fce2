//! Osculating classical orbital elements from a Cartesian state.

use std::f64::consts::TAU;

use nalgebra::Vector3;
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::kilometer,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Below this eccentricity the orbit is treated as circular, and below this inclination
/// (or above pi minus it) as equatorial.
const SMALL: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassicalOrbitalElements {
    /// Infinite for a parabolic orbit, negative for a hyperbolic one.
    pub semimajor_axis: Length,
    pub eccentricity: f64,
    pub inclination: Angle,
    pub raan: Angle,
    /// For an equatorial orbit, the longitude of perigee. Zero for a circular orbit.
    pub argument_of_perigee: Angle,
    /// For a circular orbit, the argument of latitude (or the true longitude if it is also
    /// equatorial).
    pub true_anomaly: Angle,
    pub mean_anomaly: Angle,
}

fn clamped_acos(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).acos()
}

/// `angle`, or its reflection when `flip` is set, in [0, 2pi).
fn quadrant(angle: f64, flip: bool) -> f64 {
    if flip {
        TAU - angle
    } else {
        angle
    }
}

impl ClassicalOrbitalElements {
    /// Compute the osculating elements of a position (km) and velocity (km/s), for a central body
    /// with gravitational parameter `mu` (km^3/s^2).
    pub fn from_state(position: [f64; 3], velocity: [f64; 3], mu: f64) -> ClassicalOrbitalElements {
        let r = Vector3::from(position);
        let v = Vector3::from(velocity);
        let r_mag = r.norm();
        let v_mag = v.norm();

        let h = r.cross(&v);
        let h_mag = h.norm();
        let node = Vector3::new(-h.y, h.x, 0.0);
        let node_mag = node.norm();

        let r_dot_v = r.dot(&v);
        let e_vec = ((v_mag * v_mag - mu / r_mag) * r - r_dot_v * v) / mu;
        let ecc = e_vec.norm();

        let energy = 0.5 * v_mag * v_mag - mu / r_mag;
        let a = if (ecc - 1.0).abs() > SMALL {
            -mu / (2.0 * energy)
        } else {
            f64::INFINITY
        };

        let incl = clamped_acos(h.z / h_mag);
        let equatorial = incl < SMALL || (std::f64::consts::PI - incl) < SMALL;
        let circular = ecc < SMALL;

        let raan = if node_mag > SMALL && !equatorial {
            quadrant(clamped_acos(node.x / node_mag), node.y < 0.0)
        } else {
            0.0
        };

        let argp = if circular {
            0.0
        } else if equatorial {
            let longitude = e_vec.y.atan2(e_vec.x).rem_euclid(TAU);
            if incl > std::f64::consts::FRAC_PI_2 {
                (TAU - longitude).rem_euclid(TAU)
            } else {
                longitude
            }
        } else {
            quadrant(
                clamped_acos(node.dot(&e_vec) / (node_mag * ecc)),
                e_vec.z < 0.0,
            )
        };

        let nu = if !circular {
            quadrant(clamped_acos(e_vec.dot(&r) / (ecc * r_mag)), r_dot_v < 0.0)
        } else if !equatorial {
            quadrant(clamped_acos(node.dot(&r) / (node_mag * r_mag)), r.z < 0.0)
        } else {
            r.y.atan2(r.x).rem_euclid(TAU)
        };

        ClassicalOrbitalElements {
            semimajor_axis: Length::new::<kilometer>(a),
            eccentricity: ecc,
            inclination: Angle::new::<radian>(incl),
            raan: Angle::new::<radian>(raan),
            argument_of_perigee: Angle::new::<radian>(argp),
            true_anomaly: Angle::new::<radian>(nu),
            mean_anomaly: Angle::new::<radian>(mean_anomaly(nu, ecc)),
        }
    }
}

/// Mean anomaly from true anomaly, through the eccentric (or hyperbolic) anomaly.
fn mean_anomaly(nu: f64, ecc: f64) -> f64 {
    let half = (0.5 * nu).tan();
    if ecc < 1.0 {
        let e = 2.0 * (((1.0 - ecc) / (1.0 + ecc)).sqrt() * half).atan();
        (e - ecc * e.sin()).rem_euclid(TAU)
    } else if ecc > 1.0 {
        let h = 2.0 * (((ecc - 1.0) / (ecc + 1.0)).sqrt() * half).atanh();
        ecc * h.sinh() - h
    } else {
        // Barker's equation.
        half + half.powi(3) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use float_cmp::assert_approx_eq;
    use uom::si::angle::degree;

    use crate::gravity::GravitationalConstant;
    use crate::sgp4::OperationMode;
    use crate::tle;

    type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

    const MU: f64 = 398600.8;

    #[test]
    fn test_circular_equatorial_orbit() {
        let speed = (MU / 7000.0).sqrt();
        let coe = ClassicalOrbitalElements::from_state([0.0, 7000.0, 0.0], [-speed, 0.0, 0.0], MU);
        assert_approx_eq!(f64, coe.semimajor_axis.get::<kilometer>(), 7000.0, epsilon = 1e-6);
        assert!(coe.eccentricity < 1e-12);
        assert_approx_eq!(f64, coe.inclination.get::<degree>(), 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, coe.true_anomaly.get::<degree>(), 90.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coe.mean_anomaly.get::<degree>(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inclined_elliptical_orbit() {
        // At perigee on the ascending node, 30 degrees inclined.
        let rp = 7000.0;
        let ecc = 0.1;
        let a = rp / (1.0 - ecc);
        let speed = (MU * (2.0 / rp - 1.0 / a)).sqrt();
        let incl = 30f64.to_radians();
        let coe = ClassicalOrbitalElements::from_state(
            [rp, 0.0, 0.0],
            [0.0, speed * incl.cos(), speed * incl.sin()],
            MU,
        );
        assert_approx_eq!(f64, coe.semimajor_axis.get::<kilometer>(), a, epsilon = 1e-6);
        assert_approx_eq!(f64, coe.eccentricity, ecc, epsilon = 1e-12);
        assert_approx_eq!(f64, coe.inclination.get::<degree>(), 30.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coe.raan.get::<degree>(), 0.0, epsilon = 1e-9);
        assert_approx_eq!(f64, coe.argument_of_perigee.get::<degree>(), 0.0, epsilon = 1e-5);
        assert_approx_eq!(f64, coe.mean_anomaly.get::<radian>().sin(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_hyperbolic_orbit() {
        let rp = 7000.0;
        let speed = 1.2 * (2.0 * MU / rp).sqrt();
        let coe = ClassicalOrbitalElements::from_state([rp, 0.0, 0.0], [0.0, speed, 0.0], MU);
        assert!(coe.eccentricity > 1.0);
        assert!(coe.semimajor_axis.get::<kilometer>() < 0.0);
    }

    #[test]
    fn test_osculating_elements_near_mean_elements() -> Result<()> {
        let set = tle::to_orbital_elements(
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
            GravitationalConstant::Wgs72,
            OperationMode::Improved,
        )?;
        let state = set.sgp4(0.0)?;
        let model = set.gravity().model();
        let coe = ClassicalOrbitalElements::from_state(state.position, state.velocity, model.mu);

        assert_approx_eq!(f64, coe.inclination.get::<degree>(), 34.2682, epsilon = 0.1);
        assert_approx_eq!(f64, coe.raan.get::<degree>(), 348.7242, epsilon = 0.1);
        assert_approx_eq!(f64, coe.eccentricity, 0.1859667, epsilon = 0.005);
        assert_approx_eq!(
            f64,
            coe.semimajor_axis.get::<kilometer>(),
            set.semi_major_axis() * model.radius,
            epsilon = 50.0
        );
        Ok(())
    }
}
