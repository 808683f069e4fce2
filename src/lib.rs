use chrono::prelude::*;
use chrono::DateTime;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod elements;
pub mod ephemeris;
pub mod frames;
pub mod geodetic;
pub mod gravity;
pub mod sgp4;
pub mod time;
pub mod tle;
#[cfg(feature = "tlegen")]
mod tlegen;

pub use elements::ClassicalOrbitalElements;
pub use ephemeris::{
    propagate_calendar, propagate_ephemeris, propagate_many, Ephemeris, EphemerisRequest,
    EphemerisSample, PropagationModel,
};
pub use frames::{EarthOrientation, Frame};
pub use geodetic::{Ellipsoid, GeodeticPosition};
pub use gravity::GravitationalConstant;
pub use sgp4::{OperationMode, OrbitalElementSet, PropagationResult};
pub use time::JulianDate;

#[derive(Debug, Error)]
pub enum Error {
    #[error("TLE was malformed: {0}")]
    MalformedTwoLineElement(#[from] tle::ParseError),
    #[error("Could not initialise propagator: {0}")]
    Initialization(#[from] sgp4::InitError),
    #[error("Error in SGP4 propagator: {0}")]
    PropagationError(#[from] sgp4::PropagationError),
    #[error("Propagation model {0} is not supported")]
    UnsupportedModel(PropagationModel),
    #[error("{0}")]
    InvalidTime(#[from] time::TimeError),
    #[error("{0}")]
    UnknownFrame(#[from] frames::UnknownFrame),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[cfg(feature = "tlegen")]
    #[error("Optimization failed: {0}")]
    OptimizationError(String),
}

impl From<tle::ElementSetError> for Error {
    fn from(e: tle::ElementSetError) -> Self {
        match e {
            tle::ElementSetError::Parse(e) => Error::MalformedTwoLineElement(e),
            tle::ElementSetError::Init(e) => Error::Initialization(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Position (km) and velocity (km/s) at an instant, in a named frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVector {
    pub epoch: DateTime<Utc>,
    pub frame: Frame,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

impl StateVector {
    /// A state in the TEME frame, as SGP-4 produces it.
    pub fn new(epoch: DateTime<Utc>, position: [f64; 3], velocity: [f64; 3]) -> StateVector {
        StateVector {
            epoch,
            frame: Frame::Teme,
            position,
            velocity,
        }
    }

    /// Osculating elements of the state under the given gravity model's mu. Pass the model the
    /// state was propagated with.
    ///
    /// Only meaningful for the inertial frames; an Earth-fixed velocity includes the rotation of
    /// the frame.
    pub fn classical_elements(&self, gravity: GravitationalConstant) -> ClassicalOrbitalElements {
        ClassicalOrbitalElements::from_state(self.position, self.velocity, gravity.model().mu)
    }

    /// The same state expressed in another frame.
    pub fn to_frame(&self, frame: Frame, eop: &EarthOrientation) -> StateVector {
        let utc = JulianDate::from_datetime(&self.epoch);
        let (position, velocity) =
            frames::transform(self.position, self.velocity, self.frame, frame, &utc, eop);
        StateVector {
            epoch: self.epoch,
            frame,
            position,
            velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoLineElement {
    elements: OrbitalElementSet,
}

impl TwoLineElement {
    /// Create a validated TwoLineElement from a string.
    pub fn new(line1: &str, line2: &str) -> Result<TwoLineElement> {
        TwoLineElement::with_options(
            line1,
            line2,
            GravitationalConstant::default(),
            OperationMode::default(),
        )
    }

    /// Create a TwoLineElement with an explicit gravity model and operation mode.
    pub fn with_options(
        line1: &str,
        line2: &str,
        gravity: GravitationalConstant,
        mode: OperationMode,
    ) -> Result<TwoLineElement> {
        let elements = tle::to_orbital_elements(line1.trim(), line2.trim(), gravity, mode)?;
        Ok(TwoLineElement { elements })
    }

    /// Create a TwoLineElement from a string containing both lines, and optionally a header line.
    pub fn from_lines(combined_lines: &str) -> Result<TwoLineElement> {
        let (line1, line2) = tle::split_lines(combined_lines)?;
        TwoLineElement::new(line1, line2)
    }

    pub fn elements(&self) -> &OrbitalElementSet {
        &self.elements
    }

    /// Get the epoch of a TwoLineElement.
    pub fn epoch(&self) -> Result<DateTime<Utc>> {
        Ok(self.elements.epoch().to_datetime()?)
    }

    /// Minutes from the element set epoch to `t`.
    pub fn minutes_since_epoch(&self, t: &DateTime<Utc>) -> f64 {
        JulianDate::from_datetime(t).minutes_since(&self.elements.epoch())
    }

    /// Propagate to an instant, in the TEME frame.
    pub fn propagate_to(&self, t: DateTime<Utc>) -> Result<StateVector> {
        let r = self.elements.sgp4(self.minutes_since_epoch(&t))?;
        Ok(StateVector::new(t, r.position, r.velocity))
    }

    /// Propagate to an instant and express the result in `frame`.
    pub fn propagate_to_frame(
        &self,
        t: DateTime<Utc>,
        frame: Frame,
        eop: &EarthOrientation,
    ) -> Result<StateVector> {
        Ok(self.propagate_to(t)?.to_frame(frame, eop))
    }

    /// Format the element set back into its two lines.
    pub fn to_lines(&self) -> (String, String) {
        tle::format_lines(&self.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use float_cmp::assert_approx_eq;

    const ISS_LINE_1: &str = "1 25544U 98067A   20148.21301450  .00001715  00000-0  38778-4 0  9992";
    const ISS_LINE_2: &str = "2 25544  51.6435  92.2789 0002570 358.0648 144.9972 15.49396855228767";

    #[test]
    fn test_simple_propagation() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let epoch = tle.epoch()?;

        let s1 = tle.propagate_to(epoch)?;
        let s2 = tle.propagate_to(epoch + Duration::hours(1))?;

        assert_ne!(s1.position, s2.position);
        assert_ne!(s1.velocity, s2.velocity);
        assert_eq!(s1.frame, Frame::Teme);

        Ok(())
    }

    #[test]
    fn test_negative_time_propagation() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let epoch = tle.epoch()?;

        let s1 = tle.propagate_to(epoch)?;
        let s2 = tle.propagate_to(epoch - Duration::days(1))?;
        assert_ne!(s1.position, s2.position);

        Ok(())
    }

    #[test]
    fn test_epoch_matches_element_set() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let epoch = tle.epoch()?;
        assert_eq!(epoch.year(), 2020);
        assert_eq!(epoch.ordinal(), 148);
        assert_approx_eq!(f64, tle.minutes_since_epoch(&epoch), 0.0, epsilon = 1e-6);

        let at_epoch = tle.propagate_to(epoch)?;
        let direct = tle.elements().sgp4(0.0)?;
        for i in 0..3 {
            assert_approx_eq!(f64, at_epoch.position[i], direct.position[i], epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_sub_minute_times_are_not_truncated() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let epoch = tle.epoch()?;
        let a = tle.propagate_to(epoch + Duration::seconds(10))?;
        let b = tle.propagate_to(epoch + Duration::seconds(40))?;
        assert_ne!(a.position, b.position);
        Ok(())
    }

    #[test]
    fn test_tle_from_lines() -> Result<()> {
        let lines = "1 25544U 98067A   20148.21301450  .00001715  00000-0  38778-4 0  9992
                     2 25544  51.6435  92.2789 0002570 358.0648 144.9972 15.49396855228767";

        let _tle = TwoLineElement::from_lines(lines)?;
        Ok(())
    }

    #[test]
    fn test_tle_from_lines_with_header() -> Result<()> {
        let lines = "ISS (ZARYA)
                     1 25544U 98067A   20148.21301450  .00001715  00000-0  38778-4 0  9992
                     2 25544  51.6435  92.2789 0002570 358.0648 144.9972 15.49396855228767";

        let _tle = TwoLineElement::from_lines(lines)?;
        Ok(())
    }

    #[test]
    fn test_tle_from_lines_with_surrounding_whitespace() -> Result<()> {
        let lines = "\nISS (ZARYA)
                     1 25544U 98067A   20148.21301450  .00001715  00000-0  38778-4 0  9992
                     2 25544  51.6435  92.2789 0002570 358.0648 144.9972 15.49396855228767\n";

        let _tle = TwoLineElement::from_lines(lines)?;

        Ok(())
    }

    #[test]
    fn test_malformed_lines_are_reported() {
        let truncated = &ISS_LINE_1[..60];
        assert!(matches!(
            TwoLineElement::new(truncated, ISS_LINE_2),
            Err(Error::MalformedTwoLineElement(_))
        ));
        assert!(matches!(
            TwoLineElement::from_lines(ISS_LINE_1),
            Err(Error::MalformedTwoLineElement(_))
        ));
    }

    #[test]
    fn test_export_reproduces_lines() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let (line1, line2) = tle.to_lines();
        assert_eq!(line1, ISS_LINE_1);
        assert_eq!(line2, ISS_LINE_2);
        Ok(())
    }

    #[test]
    fn test_frame_conversion_preserves_radius() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let t = tle.epoch()? + Duration::minutes(30);
        let eop = EarthOrientation::default();
        let teme = tle.propagate_to(t)?;
        let norm = |v: [f64; 3]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        for frame in [Frame::Gcrs, Frame::Itrs] {
            let other = tle.propagate_to_frame(t, frame, &eop)?;
            assert_eq!(other.frame, frame);
            assert_approx_eq!(f64, norm(other.position), norm(teme.position), epsilon = 1e-8);
            let back = other.to_frame(Frame::Teme, &eop);
            for i in 0..3 {
                assert_approx_eq!(f64, back.position[i], teme.position[i], epsilon = 1e-7);
            }
        }
        Ok(())
    }

    #[test]
    fn test_classical_elements_of_state() -> Result<()> {
        let tle = TwoLineElement::new(ISS_LINE_1, ISS_LINE_2)?;
        let state = tle.propagate_to(tle.epoch()?)?;
        let coe = state.classical_elements(GravitationalConstant::Wgs72);
        assert_approx_eq!(
            f64,
            coe.inclination.get::<uom::si::angle::degree>(),
            51.6435,
            epsilon = 0.1
        );
        assert!(coe.eccentricity < 0.01);
        Ok(())
    }

    #[test]
    fn test_classical_elements_follow_gravity_model() -> Result<()> {
        use uom::si::length::kilometer;

        let tle = TwoLineElement::with_options(
            ISS_LINE_1,
            ISS_LINE_2,
            GravitationalConstant::Wgs84,
            OperationMode::Improved,
        )?;
        let state = tle.propagate_to(tle.epoch()?)?;
        let wgs72 = state.classical_elements(GravitationalConstant::Wgs72);
        let wgs84 = state.classical_elements(GravitationalConstant::Wgs84);
        // A smaller mu gives a larger orbit for the same velocity.
        let difference =
            wgs84.semimajor_axis.get::<kilometer>() - wgs72.semimajor_axis.get::<kilometer>();
        assert!(difference > 1e-3, "difference {}", difference);
        assert!(difference < 1e-2, "difference {}", difference);
        assert_approx_eq!(f64, wgs84.eccentricity, wgs72.eccentricity, epsilon = 1e-4);
        Ok(())
    }
}
