use std::f64::consts::TAU;

use argmin::{
    core::{CostFunction, Executor},
    solver::neldermead::NelderMead,
};
use chrono::{DateTime, Datelike, Timelike, Utc};
use log::debug;
use uom::si::{angle::degree, length::kilometer};

use crate::sgp4::{Identity, MeanElements};
use crate::time::SECONDS_PER_DAY;
use crate::{
    tle, ClassicalOrbitalElements, EarthOrientation, Error, Frame, GravitationalConstant, Result,
    StateVector, TwoLineElement,
};

/// Largest eccentricity the seven digit field can hold.
const MAX_ECCENTRICITY: f64 = 0.9999999;

impl ClassicalOrbitalElements {
    /// Format the elements as a drag-free TLE at `epoch`, taking them as SGP-4 mean elements.
    pub fn as_tle_at(&self, catalog_num: u32, epoch: DateTime<Utc>) -> String {
        let param = [
            self.inclination.get::<degree>(),
            self.raan.get::<degree>(),
            self.eccentricity,
            self.argument_of_perigee.get::<degree>(),
            self.mean_anomaly.get::<degree>(),
            self.semimajor_axis.get::<kilometer>(),
        ];
        format_tle(catalog_num, epoch, &param)
    }
}

impl StateVector {
    /// Find a TLE string that propagates to the state vector at a given epoch
    ///
    /// Note that the generated TLE has the following simplifications:
    /// 1. It assumes that the epoch and the launch date are the same.
    /// 2. Launch number is assumed to be 1, and the launch piece is A.
    /// 3. Element set number is always 999.
    /// 4. Mean motion derivatives and ballistic coefficient are set to zero.
    /// 5. The orbit number is assumed to be zero.
    ///
    /// Because of these simplifications, the elements of the generated TLE are not guaranteed to
    /// exactly match those of the original element set. This function should not be used for
    /// production applications.
    pub fn as_tle_at(&self, catalog_num: u32, epoch: DateTime<Utc>) -> Result<String> {
        // Osculating elements seed the simplex; the cost is the squared state error after
        // propagating the candidate TLE to the epoch.
        let target = self.to_frame(Frame::Teme, &EarthOrientation::default());
        let coe = target.classical_elements(GravitationalConstant::default());
        let cost = FindTleProblem {
            catalog_num,
            epoch,
            position: target.position,
            velocity: target.velocity,
        };
        let init_param: Vec<f64> = vec![
            coe.inclination.get::<degree>(),
            coe.raan.get::<degree>(),
            coe.eccentricity,
            coe.argument_of_perigee.get::<degree>(),
            coe.mean_anomaly.get::<degree>(),
            coe.semimajor_axis.get::<kilometer>(),
        ];
        // n + 1 vertices, each offset along one parameter.
        let perturbations = [0.1, 0.1, 0.01, 1.0, 1.0, 1.0];
        let mut initial_simplex = vec![init_param.clone(); 7];
        for (i, offset) in perturbations.iter().enumerate() {
            initial_simplex[i][i] += offset;
        }
        let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(initial_simplex)
            .with_alpha(0.9)
            .and_then(|s| s.with_gamma(1.1))
            .and_then(|s| s.with_rho(0.25))
            .and_then(|s| s.with_sigma(0.1))
            .map_err(|e| Error::OptimizationError(e.to_string()))?;
        let res = Executor::new(cost, solver)
            .configure(|state| state.param(init_param).max_iters(1000).target_cost(0.0))
            .run()
            .map_err(|e| Error::OptimizationError(e.to_string()))?;

        let state = res.state();
        debug!(
            "TLE fit finished after {} iterations, cost {}",
            state.iter, state.best_cost
        );
        let best_param = state
            .best_param
            .as_ref()
            .ok_or_else(|| Error::OptimizationError("no parameters were evaluated".to_owned()))?;
        Ok(format_tle(catalog_num, epoch, best_param))
    }
}

fn generated_identity(catalog_num: u32, epoch: &DateTime<Utc>) -> Identity {
    let seconds = epoch.num_seconds_from_midnight() as f64 + epoch.nanosecond() as f64 * 1e-9;
    Identity {
        catalog_number: catalog_num,
        classification: 'U',
        international_designator: format!("{:02}001A", epoch.year() % 100),
        epoch_year: epoch.year(),
        epoch_days: epoch.ordinal() as f64 + seconds / SECONDS_PER_DAY,
        ephemeris_type: '0',
        element_number: 999,
        revolution_number: 0,
    }
}

/// Mean elements from the optimizer's parameters: inclination, RAAN, eccentricity, argument of
/// perigee and mean anomaly (degrees), then semi-major axis (km).
fn params_to_mean_elements(param: &[f64]) -> MeanElements {
    let mu = GravitationalConstant::default().model().mu;
    let semimajor_axis = param[5].max(f64::MIN_POSITIVE);
    MeanElements {
        bstar: 0.0,
        mean_motion_dot: 0.0,
        mean_motion_ddot: 0.0,
        eccentricity: param[2].clamp(0.0, MAX_ECCENTRICITY),
        inclination: param[0].clamp(0.0, 180.0).to_radians(),
        right_ascension: normalize_angle(param[1].to_radians()),
        argument_of_perigee: normalize_angle(param[3].to_radians()),
        mean_anomaly: normalize_angle(param[4].to_radians()),
        // rad/min
        mean_motion: (mu / semimajor_axis.powi(3)).sqrt() * 60.0,
    }
}

fn normalize_angle(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

fn format_tle(catalog_num: u32, epoch: DateTime<Utc>, param: &[f64]) -> String {
    let (line1, line2) = tle::format_elements(
        &generated_identity(catalog_num, &epoch),
        &params_to_mean_elements(param),
    );
    format!("{}\n{}", line1, line2)
}

struct FindTleProblem {
    catalog_num: u32,
    epoch: DateTime<Utc>,
    position: [f64; 3],
    velocity: [f64; 3],
}

impl CostFunction for FindTleProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
        let tle = format_tle(self.catalog_num, self.epoch, param);
        // Vertices the propagator rejects (suborbital, decayed) are just very bad fits.
        let propagated = TwoLineElement::from_lines(&tle).and_then(|t| t.propagate_to(self.epoch));
        let prop_sv = match propagated {
            Ok(sv) => sv,
            Err(Error::Initialization(_)) | Err(Error::PropagationError(_)) => return Ok(f64::MAX),
            Err(e) => return Err(e.into()),
        };

        let error = (self.position[0] - prop_sv.position[0]).powi(2)
            + (self.position[1] - prop_sv.position[1]).powi(2)
            + (self.position[2] - prop_sv.position[2]).powi(2)
            + (self.velocity[0] - prop_sv.velocity[0]).powi(2)
            + (self.velocity[1] - prop_sv.velocity[1]).powi(2)
            + (self.velocity[2] - prop_sv.velocity[2]).powi(2);

        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    use crate::TwoLineElement;

    use super::*;

    use chrono::TimeZone;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_can_roundtrip_state_vector_plus_epoch_to_tle() -> Result<()> {
        let epoch = Utc.with_ymd_and_hms(2021, 5, 25, 0, 0, 0).unwrap();
        let r_1 = [
            -3767.0783048821595,
            -5832.3746513067335,
            0.013350841794354097,
        ];
        let v_1 = [5.087843659697572, -3.2858873951805836, 4.561428718239809];
        let svector = StateVector::new(epoch, r_1, v_1);
        let tle_string = svector.as_tle_at(0, epoch)?;
        let svector_2 = TwoLineElement::from_lines(&tle_string)?.propagate_to(epoch)?;
        let r_2 = svector_2.position;
        let v_2 = svector_2.velocity;
        assert_approx_eq!(f64, r_1[0], r_2[0], epsilon = 0.01);
        assert_approx_eq!(f64, r_1[1], r_2[1], epsilon = 0.01);
        assert_approx_eq!(f64, r_1[2], r_2[2], epsilon = 0.01);
        assert_approx_eq!(f64, v_1[0], v_2[0], epsilon = 0.01);
        assert_approx_eq!(f64, v_1[1], v_2[1], epsilon = 0.01);
        assert_approx_eq!(f64, v_1[2], v_2[2], epsilon = 0.01);
        Ok(())
    }

    #[test]
    fn test_roundtrip_tle_to_tle() -> Result<()> {
        let epoch = Utc.with_ymd_and_hms(2021, 5, 25, 0, 0, 0).unwrap();
        let tle_1 = "1 00000U 21001A   21145.00000000  .00000000  00000-0  00000-0 0  9997\n2 00000  36.9006 237.1418 0013279   1.4043 318.6732 14.97334669000013";
        let svector = TwoLineElement::from_lines(tle_1)?.propagate_to(epoch)?;
        let tle_2 = svector.as_tle_at(0, epoch)?;
        let fitted = TwoLineElement::from_lines(&tle_2)?.propagate_to(epoch)?;
        for i in 0..3 {
            assert_approx_eq!(f64, fitted.position[i], svector.position[i], epsilon = 0.01);
        }
        Ok(())
    }

    #[test]
    fn test_roundtrip_tle_to_tle_2() -> Result<()> {
        let epoch = Utc.with_ymd_and_hms(2021, 5, 25, 0, 0, 0).unwrap();
        let tle_1 = "1 00000U 21001A   21145.00000000  .00000000  00000-0  00000-0 0  9997\n2 00000  36.9144 237.1225 1121181   3.5239 316.6354 14.96118753000010";
        let svector = TwoLineElement::from_lines(tle_1)?.propagate_to(epoch)?;
        let tle_2 = svector.as_tle_at(0, epoch)?;
        let _ = TwoLineElement::from_lines(&tle_2)?;
        Ok(())
    }

    #[test]
    fn test_elements_format_as_tle() -> Result<()> {
        let epoch = Utc.with_ymd_and_hms(2021, 5, 25, 12, 0, 0).unwrap();
        let tle = TwoLineElement::from_lines(
            "1 00000U 21001A   21145.00000000  .00000000  00000-0  00000-0 0  9997\n2 00000  36.9006 237.1418 0013279   1.4043 318.6732 14.97334669000013",
        )?;
        let coe = tle
            .propagate_to(epoch)?
            .classical_elements(GravitationalConstant::Wgs72);
        let text = coe.as_tle_at(42, epoch);
        let generated = TwoLineElement::from_lines(&text)?;
        assert_eq!(generated.elements().identity().catalog_number, 42);
        assert_eq!(generated.elements().identity().international_designator, "21001A");
        assert_approx_eq!(
            f64,
            generated.elements().identity().epoch_days,
            145.5,
            epsilon = 1e-8
        );
        Ok(())
    }
}
