//! # Ephemeris generation
//!
//! Batch propagation of an element set over a regular grid of instants, with each sample
//! converted to the requested frame. Failed samples are kept alongside their error so the
//! caller decides whether to skip or report them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::frames::{EarthOrientation, Frame};
use crate::geodetic::{self, Ellipsoid, GeodeticPosition};
use crate::sgp4::{OrbitalElementSet, PropagationError, PropagationResult};
use crate::time::calendar_to_julian;
use crate::{Error, Result, StateVector, TwoLineElement};

/// The orbit propagators a request can name. Only SGP-4 is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PropagationModel {
    Sgp4,
    NumericalRk4,
    Encke,
}

impl Default for PropagationModel {
    fn default() -> Self {
        PropagationModel::Sgp4
    }
}

impl FromStr for PropagationModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sgp4" => Ok(PropagationModel::Sgp4),
            "rk4" | "numerical" | "numerical-rk4" => Ok(PropagationModel::NumericalRk4),
            "encke" => Ok(PropagationModel::Encke),
            _ => Err(Error::InvalidRequest(format!(
                "unknown propagation model {:?}",
                s
            ))),
        }
    }
}

impl fmt::Display for PropagationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropagationModel::Sgp4 => "SGP4",
            PropagationModel::NumericalRk4 => "numerical RK4",
            PropagationModel::Encke => "Encke",
        };
        f.write_str(name)
    }
}

/// A regular grid of instants: `start + i * step` for `i` in `0..floor(duration / step)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EphemerisRequest {
    pub start: DateTime<Utc>,
    pub duration: Duration,
    pub step: Duration,
    pub frame: Frame,
}

impl EphemerisRequest {
    pub fn new(start: DateTime<Utc>, duration: Duration, step: Duration, frame: Frame) -> Self {
        EphemerisRequest {
            start,
            duration,
            step,
            frame,
        }
    }

    /// Number of samples on the grid. A negative duration yields none.
    pub fn sample_count(&self) -> Result<usize> {
        let step = self
            .step
            .num_microseconds()
            .filter(|&us| us > 0)
            .ok_or_else(|| Error::InvalidRequest(format!("step {} is not positive", self.step)))?;
        let duration = self.duration.num_microseconds().ok_or_else(|| {
            Error::InvalidRequest(format!("duration {} is out of range", self.duration))
        })?;
        Ok(usize::try_from(duration / step).unwrap_or(0))
    }

    pub fn times(&self) -> Result<Vec<DateTime<Utc>>> {
        let count = self.sample_count()?;
        (0..count)
            .map(|i| {
                i64::try_from(i)
                    .ok()
                    .zip(self.step.num_microseconds())
                    .and_then(|(i, step)| step.checked_mul(i))
                    .and_then(|us| self.start.checked_add_signed(Duration::microseconds(us)))
                    .ok_or_else(|| Error::InvalidRequest(format!("sample {} is out of range", i)))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisSample {
    pub time: DateTime<Utc>,
    pub minutes_since_epoch: f64,
    pub state: std::result::Result<StateVector, PropagationError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ephemeris {
    pub frame: Frame,
    pub samples: Vec<EphemerisSample>,
}

impl Ephemeris {
    /// Successfully propagated states, in time order.
    pub fn valid(&self) -> impl Iterator<Item = &StateVector> + '_ {
        self.samples
            .iter()
            .filter_map(|sample| sample.state.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&DateTime<Utc>, &PropagationError)> + '_ {
        self.samples
            .iter()
            .filter_map(|sample| sample.state.as_ref().err().map(|e| (&sample.time, e)))
    }

    /// Sub-satellite points of the valid samples.
    pub fn ground_track(
        &self,
        ellipsoid: &Ellipsoid,
        eop: &EarthOrientation,
    ) -> Vec<(DateTime<Utc>, GeodeticPosition)> {
        self.valid()
            .map(|state| {
                let itrs = state.to_frame(Frame::Itrs, eop);
                (state.epoch, geodetic::to_geodetic(itrs.position, ellipsoid))
            })
            .collect()
    }
}

fn sample_at(
    tle: &TwoLineElement,
    time: DateTime<Utc>,
    frame: Frame,
    eop: &EarthOrientation,
) -> EphemerisSample {
    let minutes_since_epoch = tle.minutes_since_epoch(&time);
    let state = tle
        .elements()
        .sgp4(minutes_since_epoch)
        .map(|r| StateVector::new(time, r.position, r.velocity).to_frame(frame, eop));
    if let Err(e) = &state {
        warn!("Skipping sample at {} (code {}): {}", time, e.code(), e);
    }
    EphemerisSample {
        time,
        minutes_since_epoch,
        state,
    }
}

/// Propagate an element set over the request's time grid.
pub fn propagate_ephemeris(
    model: PropagationModel,
    tle: &TwoLineElement,
    request: &EphemerisRequest,
    eop: &EarthOrientation,
) -> Result<Ephemeris> {
    if model != PropagationModel::Sgp4 {
        return Err(Error::UnsupportedModel(model));
    }
    let samples = request
        .times()?
        .into_iter()
        .map(|t| sample_at(tle, t, request.frame, eop))
        .collect();
    Ok(Ephemeris {
        frame: request.frame,
        samples,
    })
}

/// Propagate several element sets to the same instants.
pub fn propagate_many(
    tles: &[TwoLineElement],
    times: &[DateTime<Utc>],
    frame: Frame,
    eop: &EarthOrientation,
) -> Vec<Ephemeris> {
    tles.iter()
        .map(|tle| Ephemeris {
            frame,
            samples: times
                .iter()
                .map(|&t| sample_at(tle, t, frame, eop))
                .collect(),
        })
        .collect()
}

/// Propagate to a UTC calendar instant, returning the raw TEME result.
pub fn propagate_calendar(
    set: &OrbitalElementSet,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: f64,
) -> std::result::Result<PropagationResult, PropagationError> {
    set.propagate_to(&calendar_to_julian(year, month, day, hour, minute, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use float_cmp::assert_approx_eq;
    use uom::si::angle::degree;

    use crate::gravity::GravitationalConstant;
    use crate::sgp4::OperationMode;

    const ISS: (&str, &str) = (
        "1 25544U 98067A   20148.21301450  .00001715  00000-0  38778-4 0  9992",
        "2 25544  51.6435  92.2789 0002570 358.0648 144.9972 15.49396855228767",
    );

    fn iss() -> Result<TwoLineElement> {
        TwoLineElement::new(ISS.0, ISS.1)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 28, 6, 0, 0).unwrap()
    }

    fn grid(duration: Duration, step: Duration, frame: Frame) -> EphemerisRequest {
        EphemerisRequest::new(start(), duration, step, frame)
    }

    #[test]
    fn test_sample_grid() -> Result<()> {
        let request = grid(Duration::minutes(10), Duration::seconds(60), Frame::Teme);
        assert_eq!(request.sample_count()?, 10);
        let times = request.times()?;
        assert_eq!(times[0], start());
        assert_eq!(times[9], start() + Duration::minutes(9));

        let uneven = grid(Duration::seconds(150), Duration::seconds(60), Frame::Teme);
        assert_eq!(uneven.sample_count()?, 2);

        let backwards = grid(Duration::minutes(-5), Duration::seconds(60), Frame::Teme);
        assert_eq!(backwards.sample_count()?, 0);
        Ok(())
    }

    #[test]
    fn test_non_positive_step_is_rejected() {
        for step in [Duration::zero(), Duration::seconds(-1)] {
            let request = EphemerisRequest::new(start(), Duration::minutes(10), step, Frame::Teme);
            assert!(matches!(request.sample_count(), Err(Error::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_ephemeris_matches_single_propagation() -> Result<()> {
        let tle = iss()?;
        let eop = EarthOrientation::default();
        let request = grid(Duration::minutes(90), Duration::minutes(5), Frame::Gcrs);
        let ephemeris = propagate_ephemeris(PropagationModel::Sgp4, &tle, &request, &eop)?;
        assert_eq!(ephemeris.samples.len(), 18);
        assert_eq!(ephemeris.failures().count(), 0);

        let sample = &ephemeris.samples[7];
        let direct = tle.propagate_to_frame(sample.time, Frame::Gcrs, &eop)?;
        let state = sample.state.as_ref().map_err(|e| Error::PropagationError(*e))?;
        assert_eq!(state.frame, Frame::Gcrs);
        for i in 0..3 {
            assert_approx_eq!(f64, state.position[i], direct.position[i], epsilon = 1e-9);
            assert_approx_eq!(f64, state.velocity[i], direct.velocity[i], epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_other_models_are_unsupported() -> Result<()> {
        let tle = iss()?;
        let request = grid(Duration::minutes(10), Duration::minutes(1), Frame::Teme);
        for model in [PropagationModel::NumericalRk4, PropagationModel::Encke] {
            let result = propagate_ephemeris(model, &tle, &request, &EarthOrientation::default());
            assert!(matches!(result, Err(Error::UnsupportedModel(m)) if m == model));
        }
        Ok(())
    }

    #[test]
    fn test_model_names() -> Result<()> {
        assert_eq!("SGP4".parse::<PropagationModel>()?, PropagationModel::Sgp4);
        assert_eq!("rk4".parse::<PropagationModel>()?, PropagationModel::NumericalRk4);
        assert_eq!("Encke".parse::<PropagationModel>()?, PropagationModel::Encke);
        assert!("cowell".parse::<PropagationModel>().is_err());
        assert_eq!(PropagationModel::default(), PropagationModel::Sgp4);
        Ok(())
    }

    #[test]
    fn test_failed_samples_are_kept_and_skipped() -> Result<()> {
        // A very high drag term decays the orbit within a few months.
        let tle = TwoLineElement::with_options(
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  50000-0 0  4757",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
            GravitationalConstant::Wgs72,
            OperationMode::Improved,
        )?;
        let epoch = tle.epoch()?;
        let request =
            EphemerisRequest::new(epoch, Duration::days(200), Duration::days(1), Frame::Teme);
        let eop = EarthOrientation::default();
        let ephemeris = propagate_ephemeris(PropagationModel::Sgp4, &tle, &request, &eop)?;

        assert_eq!(ephemeris.samples.len(), 200);
        let failures = ephemeris.failures().count();
        assert!(failures > 0);
        let valid = ephemeris.valid().count();
        assert_eq!(valid + failures, 200);
        // Reading the states again yields the same set.
        assert_eq!(ephemeris.valid().count(), valid);
        assert!(ephemeris.valid().eq(ephemeris.valid()));
        assert!(ephemeris.samples[145].state.is_ok());
        assert!(matches!(
            ephemeris.samples[146].state,
            Err(PropagationError::Decayed(_))
        ));
        Ok(())
    }

    #[test]
    fn test_ground_track_latitude_bounded_by_inclination() -> Result<()> {
        let tle = iss()?;
        let request = grid(Duration::minutes(95), Duration::minutes(1), Frame::Teme);
        let eop = EarthOrientation::default();
        let ephemeris = propagate_ephemeris(PropagationModel::Sgp4, &tle, &request, &eop)?;
        let track = ephemeris.ground_track(&Ellipsoid::WGS84, &eop);
        assert_eq!(track.len(), 95);

        let max_latitude = track
            .iter()
            .map(|(_, g)| g.latitude.get::<degree>().abs())
            .fold(0.0, f64::max);
        assert!(max_latitude < 52.0);
        assert!(max_latitude > 50.0);
        for (_, g) in &track {
            let height = g.height.get::<uom::si::length::kilometer>();
            assert!(height > 400.0 && height < 440.0, "height was {}", height);
        }
        Ok(())
    }

    #[test]
    fn test_propagate_many() -> Result<()> {
        let tles = vec![
            iss()?,
            TwoLineElement::new(
                "1 28626U 05008A   06176.46683397 -.00000205  00000-0  10000-3 0  2190",
                "2 28626   0.0019 286.9433 0000335  13.7918  55.6504  1.00270176  4969",
            )?,
        ];
        let times = [start(), start() + Duration::hours(1)];
        let all = propagate_many(&tles, &times, Frame::Itrs, &EarthOrientation::default());
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.samples.len() == 2));
        Ok(())
    }

    #[test]
    fn test_calendar_adapter() -> Result<()> {
        let tle = iss()?;
        let r = propagate_calendar(tle.elements(), 2020, 5, 28, 6, 0, 0.0)?;
        let direct = tle.propagate_to(start())?;
        for i in 0..3 {
            assert_approx_eq!(f64, r.position[i], direct.position[i], epsilon = 1e-6);
        }
        Ok(())
    }
}
