//! # Reference frames
//!
//! Conversions between the TEME frame SGP-4 produces, the celestial GCRS and the Earth-fixed
//! ITRS. The celestial path uses the IAU-76 precession and IAU-80 nutation theories; the
//! terrestrial path rotates by Greenwich mean sidereal time and applies polar motion.
//!
//! Every conversion goes through TEME. Velocities pick up the time derivative of the rotation,
//! v' = M v + dM/dt r, which for the Earth-fixed frame is the Earth rotation term.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::{gstime, JulianDate, SECONDS_PER_DAY};

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Nominal Earth rotation rate, rad/s.
const EARTH_ROTATION_RATE: f64 = 7.292115146706979e-5;

/// Half-width of the central difference used for precession-nutation rates, seconds.
const RATE_STEP: f64 = 60.0;

// Frame bias of J2000 relative to the GCRS, arcseconds.
const BIAS_XI0: f64 = -0.0166170;
const BIAS_ETA0: f64 = -0.0068192;
const BIAS_DA0: f64 = -0.01460;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown reference frame {0:?}")]
pub struct UnknownFrame(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Frame {
    /// True equator, mean equinox. Native SGP-4 output.
    Teme,
    /// Geocentric celestial reference system.
    Gcrs,
    /// International terrestrial reference system (Earth-fixed).
    Itrs,
}

impl FromStr for Frame {
    type Err = UnknownFrame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEME" => Ok(Frame::Teme),
            "GCRS" => Ok(Frame::Gcrs),
            "ITRS" | "ITRF" => Ok(Frame::Itrs),
            _ => Err(UnknownFrame(s.to_owned())),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frame::Teme => "TEME",
            Frame::Gcrs => "GCRS",
            Frame::Itrs => "ITRS",
        };
        f.write_str(name)
    }
}

/// Earth orientation parameters. All zero unless the caller supplies published values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EarthOrientation {
    /// UT1 - UTC, seconds.
    pub ut1_utc: f64,
    /// Polar motion, arcseconds.
    pub xp: f64,
    pub yp: f64,
    /// Excess length of day, seconds.
    pub lod: f64,
}

/// A time dependent rotation between two frames: the matrix and its rate of change per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRotation {
    pub rotation: Matrix3<f64>,
    pub rate: Matrix3<f64>,
}

impl FrameRotation {
    pub fn identity() -> FrameRotation {
        FrameRotation::fixed(Matrix3::identity())
    }

    pub fn fixed(rotation: Matrix3<f64>) -> FrameRotation {
        FrameRotation {
            rotation,
            rate: Matrix3::zeros(),
        }
    }

    /// The reverse rotation. For an orthogonal M the inverse is its transpose, and so is the rate.
    pub fn inverse(&self) -> FrameRotation {
        FrameRotation {
            rotation: self.rotation.transpose(),
            rate: self.rate.transpose(),
        }
    }

    /// Apply `self` first and then `next`.
    pub fn then(&self, next: &FrameRotation) -> FrameRotation {
        FrameRotation {
            rotation: next.rotation * self.rotation,
            rate: next.rate * self.rotation + next.rotation * self.rate,
        }
    }

    pub fn apply(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        (
            self.rotation * position,
            self.rotation * velocity + self.rate * position,
        )
    }
}

/// Frame rotation about x.
fn r1(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Frame rotation about y.
fn r2(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

/// Frame rotation about z.
fn r3(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Derivative of `r3` with respect to its angle.
fn r3_derivative(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(-s, c, 0.0, -c, -s, 0.0, 0.0, 0.0, 0.0)
}

/// IAU-80 nutation series, largest terms. Multipliers of D, M, M', F and Omega, then the
/// longitude coefficient and its rate, then the obliquity coefficient and its rate, in 0.0001".
#[rustfmt::skip]
const NUTATION_TERMS: [([i8; 5], f64, f64, f64, f64); 40] = [
    ([ 0,  0,  0,  0,  1], -171996.0, -174.2, 92025.0,  8.9),
    ([-2,  0,  0,  2,  2],  -13187.0,   -1.6,  5736.0, -3.1),
    ([ 0,  0,  0,  2,  2],   -2274.0,   -0.2,   977.0, -0.5),
    ([ 0,  0,  0,  0,  2],    2062.0,    0.2,  -895.0,  0.5),
    ([ 0,  1,  0,  0,  0],    1426.0,   -3.4,    54.0, -0.1),
    ([ 0,  0,  1,  0,  0],     712.0,    0.1,    -7.0,  0.0),
    ([-2,  1,  0,  2,  2],    -517.0,    1.2,   224.0, -0.6),
    ([ 0,  0,  0,  2,  1],    -386.0,   -0.4,   200.0,  0.0),
    ([ 0,  0,  1,  2,  2],    -301.0,    0.0,   129.0, -0.1),
    ([-2, -1,  0,  2,  2],     217.0,   -0.5,   -95.0,  0.3),
    ([-2,  0,  1,  0,  0],    -158.0,    0.0,     0.0,  0.0),
    ([-2,  0,  0,  2,  1],     129.0,    0.1,   -70.0,  0.0),
    ([ 0,  0, -1,  2,  2],     123.0,    0.0,   -53.0,  0.0),
    ([ 2,  0,  0,  0,  0],      63.0,    0.0,     0.0,  0.0),
    ([ 0,  0,  1,  0,  1],      63.0,    0.1,   -33.0,  0.0),
    ([ 2,  0, -1,  2,  2],     -59.0,    0.0,    26.0,  0.0),
    ([ 0,  0, -1,  0,  1],     -58.0,   -0.1,    32.0,  0.0),
    ([ 0,  0,  1,  2,  1],     -51.0,    0.0,    27.0,  0.0),
    ([-2,  0,  2,  0,  0],      48.0,    0.0,     0.0,  0.0),
    ([ 0,  0, -2,  2,  1],      46.0,    0.0,   -24.0,  0.0),
    ([ 2,  0,  0,  2,  2],     -38.0,    0.0,    16.0,  0.0),
    ([ 0,  0,  2,  2,  2],     -31.0,    0.0,    13.0,  0.0),
    ([ 0,  0,  2,  0,  0],      29.0,    0.0,     0.0,  0.0),
    ([-2,  0,  1,  2,  2],      29.0,    0.0,   -12.0,  0.0),
    ([ 0,  0,  0,  2,  0],      26.0,    0.0,     0.0,  0.0),
    ([-2,  0,  0,  2,  0],     -22.0,    0.0,     0.0,  0.0),
    ([ 0,  0, -1,  2,  1],      21.0,    0.0,   -10.0,  0.0),
    ([ 0,  2,  0,  0,  0],      17.0,   -0.1,     0.0,  0.0),
    ([ 2,  0, -1,  0,  1],      16.0,    0.0,    -8.0,  0.0),
    ([-2,  2,  0,  2,  2],     -16.0,    0.1,     7.0,  0.0),
    ([ 0,  1,  0,  0,  1],     -15.0,    0.0,     9.0,  0.0),
    ([-2,  0,  1,  0,  1],     -13.0,    0.0,     7.0,  0.0),
    ([ 0, -1,  0,  0,  1],     -12.0,    0.0,     6.0,  0.0),
    ([ 0,  0,  2, -2,  0],      11.0,    0.0,     0.0,  0.0),
    ([ 2,  0, -1,  2,  1],     -10.0,    0.0,     5.0,  0.0),
    ([ 2,  0,  1,  2,  2],      -8.0,    0.0,     3.0,  0.0),
    ([ 0,  1,  0,  2,  2],       7.0,    0.0,    -3.0,  0.0),
    ([-2,  1,  1,  0,  0],      -7.0,    0.0,     0.0,  0.0),
    ([ 0, -1,  0,  2,  2],      -7.0,    0.0,     3.0,  0.0),
    ([ 2,  0,  0,  2,  1],      -7.0,    0.0,     3.0,  0.0),
];

/// Nutation in longitude and obliquity, radians, for TT centuries since J2000.
pub fn nutation(t: f64) -> (f64, f64) {
    let t2 = t * t;
    let t3 = t2 * t;
    let arguments = [
        297.85036 + 445267.111480 * t - 0.0019142 * t2 + t3 / 189474.0,
        357.52772 + 35999.050340 * t - 0.0001603 * t2 - t3 / 300000.0,
        134.96298 + 477198.867398 * t + 0.0086972 * t2 + t3 / 56250.0,
        93.27191 + 483202.017538 * t - 0.0036825 * t2 + t3 / 327270.0,
        125.04452 - 1934.136261 * t + 0.0020708 * t2 + t3 / 450000.0,
    ]
    .map(|deg: f64| (deg % 360.0).to_radians());

    let (dpsi, deps) = NUTATION_TERMS.iter().fold(
        (0.0, 0.0),
        |(dpsi, deps), (multipliers, a, b, c, d)| {
            let angle: f64 = multipliers
                .iter()
                .zip(arguments.iter())
                .map(|(m, arg)| *m as f64 * arg)
                .sum();
            (
                dpsi + (a + b * t) * angle.sin(),
                deps + (c + d * t) * angle.cos(),
            )
        },
    );
    (dpsi * 1e-4 * ARCSEC_TO_RAD, deps * 1e-4 * ARCSEC_TO_RAD)
}

/// Mean obliquity of the ecliptic (IAU-80), radians.
pub fn mean_obliquity(t: f64) -> f64 {
    (84381.448 - 46.8150 * t - 0.00059 * t * t + 0.001813 * t * t * t) * ARCSEC_TO_RAD
}

/// IAU-76 precession, mapping J2000 mean coordinates to mean of date.
pub fn precession(t: f64) -> Matrix3<f64> {
    let t2 = t * t;
    let t3 = t2 * t;
    let zeta = (2306.2181 * t + 0.30188 * t2 + 0.017998 * t3) * ARCSEC_TO_RAD;
    let theta = (2004.3109 * t - 0.42665 * t2 - 0.041833 * t3) * ARCSEC_TO_RAD;
    let z = (2306.2181 * t + 1.09468 * t2 + 0.018203 * t3) * ARCSEC_TO_RAD;
    r3(-z) * r2(theta) * r3(-zeta)
}

/// Frame bias, mapping GCRS to J2000 mean coordinates.
pub fn frame_bias() -> Matrix3<f64> {
    r1(-BIAS_ETA0 * ARCSEC_TO_RAD) * r2(BIAS_XI0 * ARCSEC_TO_RAD) * r3(BIAS_DA0 * ARCSEC_TO_RAD)
}

/// Rotation from TEME to GCRS at a TT instant.
fn teme_to_gcrs_matrix(tt: &JulianDate) -> Matrix3<f64> {
    let t = tt.centuries_since_j2000();
    let (dpsi, deps) = nutation(t);
    let mean_eps = mean_obliquity(t);
    let true_eps = mean_eps + deps;
    let eqeq = dpsi * mean_eps.cos();

    let teme_to_tod = r3(-eqeq);
    let nutation = r1(-true_eps) * r3(-dpsi) * r1(mean_eps);
    frame_bias().transpose() * precession(t).transpose() * nutation.transpose() * teme_to_tod
}

/// TEME to GCRS at a UTC instant.
pub fn teme_to_gcrs(utc: &JulianDate) -> FrameRotation {
    let tt = utc.to_tt();
    let ahead = teme_to_gcrs_matrix(&tt.add_seconds(RATE_STEP));
    let behind = teme_to_gcrs_matrix(&tt.add_seconds(-RATE_STEP));
    FrameRotation {
        rotation: teme_to_gcrs_matrix(&tt),
        rate: (ahead - behind) / (2.0 * RATE_STEP),
    }
}

/// Polar motion, mapping the pseudo Earth-fixed frame to the ITRS.
fn polar_motion(eop: &EarthOrientation) -> Matrix3<f64> {
    r1(-eop.yp * ARCSEC_TO_RAD) * r2(-eop.xp * ARCSEC_TO_RAD)
}

/// TEME to ITRS at a UTC instant.
pub fn teme_to_itrs(utc: &JulianDate, eop: &EarthOrientation) -> FrameRotation {
    let ut1 = utc.to_ut1(eop.ut1_utc);
    let gmst = gstime(ut1.value());
    let omega = EARTH_ROTATION_RATE * (1.0 - eop.lod / SECONDS_PER_DAY);
    let w = polar_motion(eop);
    FrameRotation {
        rotation: w * r3(gmst),
        rate: w * r3_derivative(gmst) * omega,
    }
}

fn from_teme(frame: Frame, utc: &JulianDate, eop: &EarthOrientation) -> FrameRotation {
    match frame {
        Frame::Teme => FrameRotation::identity(),
        Frame::Gcrs => teme_to_gcrs(utc),
        Frame::Itrs => teme_to_itrs(utc, eop),
    }
}

/// The rotation taking coordinates in `from` to coordinates in `to` at a UTC instant.
pub fn rotation(from: Frame, to: Frame, utc: &JulianDate, eop: &EarthOrientation) -> FrameRotation {
    if from == to {
        return FrameRotation::identity();
    }
    from_teme(from, utc, eop)
        .inverse()
        .then(&from_teme(to, utc, eop))
}

/// Convert a position (km) and velocity (km/s) between frames at a UTC instant.
pub fn transform(
    position: [f64; 3],
    velocity: [f64; 3],
    from: Frame,
    to: Frame,
    utc: &JulianDate,
    eop: &EarthOrientation,
) -> ([f64; 3], [f64; 3]) {
    let (r, v) = rotation(from, to, utc, eop).apply(
        &Vector3::from(position),
        &Vector3::from(velocity),
    );
    (r.into(), v.into())
}
