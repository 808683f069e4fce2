//! # SGP-4
//!
//! A pure Rust implementation of the SGP-4/SDP-4 propagator as revised by Vallado et al.
//! ("Revisiting Spacetrack Report #3", AIAA 2006-6753).
//!
//! An [`OrbitalElementSet`] is initialised once from mean elements and is immutable afterwards.
//! Evaluating it at a time since epoch never mutates it, for near-earth and deep-space orbits
//! alike, so one set can be propagated from many threads at once.

mod deep_space;

use std::f64::consts::{PI, TAU};

use log::debug;
use thiserror::Error;

use crate::gravity::{GravitationalConstant, GravityModel};
use crate::time::{gstime, JulianDate, JD_1950};

use deep_space::{DeepSpace, DeepSpaceInit, MeanState};

pub use deep_space::ResonanceKind;

const X2O3: f64 = 2.0 / 3.0;
const TEMP4: f64 = 1.5e-12;

/// Orbits with a period at or above this many minutes get the deep-space treatment.
const DEEP_SPACE_PERIOD: f64 = 225.0;

/// Perigee below this height (km) switches to the simplified drag model.
const SIMPLIFIED_DRAG_PERIGEE: f64 = 220.0;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InitError {
    #[error("Eccentricity {0} is outside [0, 1)")]
    Eccentricity(f64),
    #[error("Inclination {0} rad is outside [0, pi]")]
    Inclination(f64),
    #[error("Mean motion {0} rad/min is not positive")]
    MeanMotion(f64),
    #[error("Semi-major axis {0} earth radii is not positive")]
    SemiMajorAxis(f64),
    #[error("Perigee is {0} km below the surface")]
    SubOrbital(f64),
    #[error("Evaluation at epoch failed: {0}")]
    Epoch(#[from] PropagationError),
}

/// Failure of a single propagation. `code()` gives the conventional SGP-4 error number.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PropagationError {
    #[error("Mean eccentricity {0} is outside -0.001 <= e < 1")]
    MeanEccentricity(f64),
    #[error("Mean motion {0} is not positive")]
    MeanMotion(f64),
    #[error("Perturbed eccentricity {0} is outside [0, 1]")]
    PerturbedEccentricity(f64),
    #[error("Semi-latus rectum {0} is negative")]
    SemiLatusRectum(f64),
    #[error("Propagated state is not finite")]
    NonFinite,
    #[error("Satellite has decayed, radius {0} earth radii")]
    Decayed(f64),
}

impl PropagationError {
    pub fn code(&self) -> u8 {
        use PropagationError::*;

        match self {
            MeanEccentricity(_) => 1,
            MeanMotion(_) => 2,
            PerturbedEccentricity(_) => 3,
            SemiLatusRectum(_) => 4,
            NonFinite => 5,
            Decayed(_) => 6,
        }
    }
}

/// Selects between the operational (AFSPC) and improved formulations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperationMode {
    AirForceSpaceCenter,
    Improved,
}

impl Default for OperationMode {
    fn default() -> Self {
        OperationMode::Improved
    }
}

/// Catalog metadata carried alongside the elements. Not used by the propagator itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub catalog_number: u32,
    pub classification: char,
    pub international_designator: String,
    /// Four digit epoch year.
    pub epoch_year: i32,
    /// Fractional day of year of the epoch, 1.0 being January 1st 00:00.
    pub epoch_days: f64,
    pub ephemeris_type: char,
    pub element_number: u32,
    pub revolution_number: u32,
}

impl Default for Identity {
    fn default() -> Self {
        Identity {
            catalog_number: 0,
            classification: 'U',
            international_designator: String::new(),
            epoch_year: 2000,
            epoch_days: 1.0,
            ephemeris_type: '0',
            element_number: 0,
            revolution_number: 0,
        }
    }
}

/// Mean elements at epoch. Angles in radians, mean motion in rad/min.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanElements {
    /// Drag term, 1/earth radii.
    pub bstar: f64,
    /// First derivative of mean motion, rad/min^2.
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion, rad/min^3.
    pub mean_motion_ddot: f64,
    pub eccentricity: f64,
    pub argument_of_perigee: f64,
    pub inclination: f64,
    pub mean_anomaly: f64,
    /// Kozai mean motion, as published.
    pub mean_motion: f64,
    pub right_ascension: f64,
}

/// Secular and drag coefficients shared by every orbit class.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct NearEarth {
    simplified: bool,
    aycof: f64,
    con41: f64,
    cc1: f64,
    cc4: f64,
    cc5: f64,
    d2: f64,
    d3: f64,
    d4: f64,
    delmo: f64,
    eta: f64,
    argpdot: f64,
    omgcof: f64,
    sinmao: f64,
    t2cof: f64,
    t3cof: f64,
    t4cof: f64,
    t5cof: f64,
    x1mth2: f64,
    x7thm1: f64,
    mdot: f64,
    nodedot: f64,
    xlcof: f64,
    xmcof: f64,
    nodecf: f64,
}

/// Position (km) and velocity (km/s) in the TEME frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationResult {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

/// An initialised SGP-4 element set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElementSet {
    identity: Identity,
    epoch: JulianDate,
    elements: MeanElements,
    gravity: GravitationalConstant,
    operation_mode: OperationMode,
    /// Brouwer mean motion, rad/min.
    no_unkozai: f64,
    /// Semi-major axis, earth radii.
    a: f64,
    alta: f64,
    altp: f64,
    /// Sidereal time at epoch, rad.
    gsto: f64,
    near_earth: NearEarth,
    deep_space: Option<DeepSpace>,
}

impl OrbitalElementSet {
    /// Initialise an element set from mean elements, without catalog metadata.
    pub fn from_elements(
        epoch: JulianDate,
        elements: MeanElements,
        gravity: GravitationalConstant,
        operation_mode: OperationMode,
    ) -> Result<OrbitalElementSet, InitError> {
        OrbitalElementSet::new(
            Identity::default(),
            epoch,
            elements,
            gravity,
            operation_mode,
        )
    }

    /// Initialise an element set. The model is evaluated once at epoch, and any failure there
    /// is reported as an initialisation error.
    pub fn new(
        identity: Identity,
        epoch: JulianDate,
        elements: MeanElements,
        gravity: GravitationalConstant,
        operation_mode: OperationMode,
    ) -> Result<OrbitalElementSet, InitError> {
        let ecco = elements.eccentricity;
        let inclo = elements.inclination;
        let no_kozai = elements.mean_motion;
        if !(0.0..1.0).contains(&ecco) {
            return Err(InitError::Eccentricity(ecco));
        }
        if !(0.0..=PI).contains(&inclo) {
            return Err(InitError::Inclination(inclo));
        }
        if !(no_kozai > 0.0) {
            return Err(InitError::MeanMotion(no_kozai));
        }

        let g = gravity.model();
        let GravityModel {
            radius,
            xke,
            j2,
            j4,
            j3oj2,
            tumin,
            ..
        } = *g;
        let bstar = elements.bstar;
        let argpo = elements.argument_of_perigee;
        let mo = elements.mean_anomaly;
        let nodeo = elements.right_ascension;
        let epoch_1950 = (epoch.jd - JD_1950) + epoch.fraction;

        let ss = 78.0 / radius + 1.0;
        let qzms2t = ((120.0 - 78.0) / radius).powf(4.0);

        // Recover the Brouwer mean motion from the published Kozai value.
        let eccsq = ecco * ecco;
        let omeosq = 1.0 - eccsq;
        let rteosq = omeosq.sqrt();
        let cosio = inclo.cos();
        let cosio2 = cosio * cosio;
        let ak = (xke / no_kozai).powf(X2O3);
        let d1 = 0.75 * j2 * (3.0 * cosio2 - 1.0) / (rteosq * omeosq);
        let mut del = d1 / (ak * ak);
        let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
        del = d1 / (adel * adel);
        let no_unkozai = no_kozai / (1.0 + del);

        let ao = (xke / no_unkozai).powf(X2O3);
        if !(ao > 0.0) {
            return Err(InitError::SemiMajorAxis(ao));
        }
        let sinio = inclo.sin();
        let po = ao * omeosq;
        let con42 = 1.0 - 5.0 * cosio2;
        let con41 = -con42 - cosio2 - cosio2;
        let posq = po * po;
        let rp = ao * (1.0 - ecco);
        if rp < 1.0 {
            return Err(InitError::SubOrbital((1.0 - rp) * radius));
        }

        let gsto = match operation_mode {
            OperationMode::AirForceSpaceCenter => afspc_sidereal_time(epoch_1950),
            OperationMode::Improved => gstime(epoch_1950 + JD_1950),
        };

        let a = (no_unkozai * tumin).powf(-2.0 / 3.0);
        let alta = a * (1.0 + ecco) - 1.0;
        let altp = a * (1.0 - ecco) - 1.0;

        let mut ne = NearEarth {
            simplified: rp < SIMPLIFIED_DRAG_PERIGEE / radius + 1.0,
            con41,
            ..NearEarth::default()
        };

        // Atmospheric density parameter, adjusted for low perigees.
        let mut sfour = ss;
        let mut qzms24 = qzms2t;
        let perige = (rp - 1.0) * radius;
        if perige < 156.0 {
            sfour = perige - 78.0;
            if perige < 98.0 {
                sfour = 20.0;
            }
            qzms24 = ((120.0 - sfour) / radius).powf(4.0);
            sfour = sfour / radius + 1.0;
        }
        let pinvsq = 1.0 / posq;

        let tsi = 1.0 / (ao - sfour);
        ne.eta = ao * ecco * tsi;
        let etasq = ne.eta * ne.eta;
        let eeta = ecco * ne.eta;
        let psisq = (1.0 - etasq).abs();
        let coef = qzms24 * tsi.powf(4.0);
        let coef1 = coef / psisq.powf(3.5);
        let cc2 = coef1
            * no_unkozai
            * (ao * (1.0 + 1.5 * etasq + eeta * (4.0 + etasq))
                + 0.375 * j2 * tsi / psisq * con41 * (8.0 + 3.0 * etasq * (8.0 + etasq)));
        ne.cc1 = bstar * cc2;
        let mut cc3 = 0.0;
        if ecco > 1.0e-4 {
            cc3 = -2.0 * coef * tsi * j3oj2 * no_unkozai * sinio / ecco;
        }
        ne.x1mth2 = 1.0 - cosio2;
        ne.cc4 = 2.0
            * no_unkozai
            * coef1
            * ao
            * omeosq
            * (ne.eta * (2.0 + 0.5 * etasq) + ecco * (0.5 + 2.0 * etasq)
                - j2 * tsi / (ao * psisq)
                    * (-3.0 * con41 * (1.0 - 2.0 * eeta + etasq * (1.5 - 0.5 * eeta))
                        + 0.75
                            * ne.x1mth2
                            * (2.0 * etasq - eeta * (1.0 + etasq))
                            * (2.0 * argpo).cos()));
        ne.cc5 = 2.0 * coef1 * ao * omeosq * (1.0 + 2.75 * (etasq + eeta) + eeta * etasq);

        // Secular rates from J2 and J4.
        let cosio4 = cosio2 * cosio2;
        let temp1 = 1.5 * j2 * pinvsq * no_unkozai;
        let temp2 = 0.5 * temp1 * j2 * pinvsq;
        let temp3 = -0.46875 * j4 * pinvsq * pinvsq * no_unkozai;
        ne.mdot = no_unkozai
            + 0.5 * temp1 * rteosq * con41
            + 0.0625 * temp2 * rteosq * (13.0 - 78.0 * cosio2 + 137.0 * cosio4);
        ne.argpdot = -0.5 * temp1 * con42
            + 0.0625 * temp2 * (7.0 - 114.0 * cosio2 + 395.0 * cosio4)
            + temp3 * (3.0 - 36.0 * cosio2 + 49.0 * cosio4);
        let xhdot1 = -temp1 * cosio;
        ne.nodedot = xhdot1
            + (0.5 * temp2 * (4.0 - 19.0 * cosio2) + 2.0 * temp3 * (3.0 - 7.0 * cosio2)) * cosio;
        ne.omgcof = bstar * cc3 * argpo.cos();
        if ecco > 1.0e-4 {
            ne.xmcof = -X2O3 * coef * bstar / eeta;
        }
        ne.nodecf = 3.5 * omeosq * xhdot1 * ne.cc1;
        ne.t2cof = 1.5 * ne.cc1;
        ne.xlcof = long_period_coefficient(j3oj2, sinio, cosio);
        ne.aycof = -0.5 * j3oj2 * sinio;
        ne.delmo = (1.0 + ne.eta * mo.cos()).powf(3.0);
        ne.sinmao = mo.sin();
        ne.x7thm1 = 7.0 * cosio2 - 1.0;

        let deep_space = if TAU / no_unkozai >= DEEP_SPACE_PERIOD {
            ne.simplified = true;
            Some(DeepSpace::new(&DeepSpaceInit {
                epoch: epoch_1950,
                gsto,
                xke,
                eccentricity: ecco,
                inclination: inclo,
                node: nodeo,
                argument_of_perigee: argpo,
                mean_anomaly: mo,
                mean_motion: no_unkozai,
                mdot: ne.mdot,
                argpdot: ne.argpdot,
                nodedot: ne.nodedot,
            }))
        } else {
            None
        };

        if !ne.simplified {
            let cc1sq = ne.cc1 * ne.cc1;
            ne.d2 = 4.0 * ao * tsi * cc1sq;
            let temp = ne.d2 * tsi * ne.cc1 / 3.0;
            ne.d3 = (17.0 * ao + sfour) * temp;
            ne.d4 = 0.5 * temp * ao * tsi * (221.0 * ao + 31.0 * sfour) * ne.cc1;
            ne.t3cof = ne.d2 + 2.0 * cc1sq;
            ne.t4cof = 0.25 * (3.0 * ne.d3 + ne.cc1 * (12.0 * ne.d2 + 10.0 * cc1sq));
            ne.t5cof = 0.2
                * (3.0 * ne.d4
                    + 12.0 * ne.cc1 * ne.d3
                    + 6.0 * ne.d2 * ne.d2
                    + 15.0 * cc1sq * (2.0 * ne.d2 + cc1sq));
        }

        let set = OrbitalElementSet {
            identity,
            epoch,
            elements,
            gravity,
            operation_mode,
            no_unkozai,
            a,
            alta,
            altp,
            gsto,
            near_earth: ne,
            deep_space,
        };
        debug!(
            "Initialised catalog number {}: period {:.2} min, deep space {}, resonance {:?}",
            set.identity.catalog_number,
            set.period(),
            set.is_deep_space(),
            set.resonance()
        );

        set.sgp4(0.0)?;
        Ok(set)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn epoch(&self) -> JulianDate {
        self.epoch
    }

    pub fn elements(&self) -> &MeanElements {
        &self.elements
    }

    pub fn gravity(&self) -> GravitationalConstant {
        self.gravity
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.operation_mode
    }

    /// Brouwer mean motion, rad/min.
    pub fn mean_motion(&self) -> f64 {
        self.no_unkozai
    }

    /// Orbital period in minutes.
    pub fn period(&self) -> f64 {
        TAU / self.no_unkozai
    }

    /// Mean semi-major axis in earth radii.
    pub fn semi_major_axis(&self) -> f64 {
        self.a
    }

    /// Apogee and perigee altitudes in earth radii.
    pub fn apsis_altitudes(&self) -> (f64, f64) {
        (self.alta, self.altp)
    }

    /// Greenwich sidereal time at epoch, rad.
    pub fn sidereal_time_at_epoch(&self) -> f64 {
        self.gsto
    }

    pub fn is_deep_space(&self) -> bool {
        self.deep_space.is_some()
    }

    pub fn uses_simplified_drag(&self) -> bool {
        self.near_earth.simplified
    }

    pub fn resonance(&self) -> ResonanceKind {
        self.deep_space
            .as_ref()
            .map(|ds| ds.resonance_kind())
            .unwrap_or(ResonanceKind::None)
    }

    /// Propagate to a Julian date (UTC).
    pub fn propagate_to(&self, date: &JulianDate) -> Result<PropagationResult, PropagationError> {
        self.sgp4(date.minutes_since(&self.epoch))
    }

    /// Evaluate the model `tsince` minutes from epoch. Negative times propagate backwards.
    pub fn sgp4(&self, tsince: f64) -> Result<PropagationResult, PropagationError> {
        let g = self.gravity.model();
        let ne = &self.near_earth;
        let el = &self.elements;
        let t = tsince;
        let vkmpersec = g.radius * g.xke / 60.0;

        // Secular gravity and atmospheric drag.
        let xmdf = el.mean_anomaly + ne.mdot * t;
        let argpdf = el.argument_of_perigee + ne.argpdot * t;
        let nodedf = el.right_ascension + ne.nodedot * t;
        let mut argpm = argpdf;
        let mut mm = xmdf;
        let t2 = t * t;
        let mut nodem = nodedf + ne.nodecf * t2;
        let mut tempa = 1.0 - ne.cc1 * t;
        let mut tempe = el.bstar * ne.cc4 * t;
        let mut templ = ne.t2cof * t2;

        if !ne.simplified {
            let delomg = ne.omgcof * t;
            let delmtemp = 1.0 + ne.eta * xmdf.cos();
            let delm = ne.xmcof * (delmtemp.powf(3.0) - ne.delmo);
            let temp = delomg + delm;
            mm = xmdf + temp;
            argpm = argpdf - temp;
            let t3 = t2 * t;
            let t4 = t3 * t;
            tempa = tempa - ne.d2 * t2 - ne.d3 * t3 - ne.d4 * t4;
            tempe += el.bstar * ne.cc5 * (mm.sin() - ne.sinmao);
            templ = templ + ne.t3cof * t3 + t4 * (ne.t4cof + t * ne.t5cof);
        }

        let mut state = MeanState {
            eccentricity: el.eccentricity,
            inclination: el.inclination,
            node: nodem,
            argument_of_perigee: argpm,
            mean_anomaly: mm,
            mean_motion: self.no_unkozai,
        };
        if let Some(ds) = &self.deep_space {
            ds.secular(t, &mut state);
        }

        let mut nm = state.mean_motion;
        if nm <= 0.0 {
            return Err(PropagationError::MeanMotion(nm));
        }
        let am = (g.xke / nm).powf(X2O3) * tempa * tempa;
        nm = g.xke / am.powf(1.5);
        let mut em = state.eccentricity - tempe;
        if em >= 1.0 || em < -0.001 {
            return Err(PropagationError::MeanEccentricity(em));
        }
        if em < 1.0e-6 {
            em = 1.0e-6;
        }
        mm = state.mean_anomaly + self.no_unkozai * templ;
        let xlm = mm + state.argument_of_perigee + state.node;
        nodem = state.node % TAU;
        argpm = state.argument_of_perigee % TAU;
        let xlm = xlm % TAU;
        mm = (xlm - argpm - nodem) % TAU;

        // Lunar-solar periodics.
        let mut osc = MeanState {
            eccentricity: em,
            inclination: state.inclination,
            node: nodem,
            argument_of_perigee: argpm,
            mean_anomaly: mm,
            mean_motion: nm,
        };
        let (aycof, xlcof, con41, x1mth2, x7thm1);
        let (sinip, cosip);
        if let Some(ds) = &self.deep_space {
            let afspc = self.operation_mode == OperationMode::AirForceSpaceCenter;
            ds.periodics(t, &mut osc, afspc);
            if osc.inclination < 0.0 {
                osc.inclination = -osc.inclination;
                osc.node += PI;
                osc.argument_of_perigee -= PI;
            }
            if osc.eccentricity < 0.0 || osc.eccentricity > 1.0 {
                return Err(PropagationError::PerturbedEccentricity(osc.eccentricity));
            }
            sinip = osc.inclination.sin();
            cosip = osc.inclination.cos();
            aycof = -0.5 * g.j3oj2 * sinip;
            xlcof = long_period_coefficient(g.j3oj2, sinip, cosip);
            let cosisq = cosip * cosip;
            con41 = 3.0 * cosisq - 1.0;
            x1mth2 = 1.0 - cosisq;
            x7thm1 = 7.0 * cosisq - 1.0;
        } else {
            sinip = osc.inclination.sin();
            cosip = osc.inclination.cos();
            aycof = ne.aycof;
            xlcof = ne.xlcof;
            con41 = ne.con41;
            x1mth2 = ne.x1mth2;
            x7thm1 = ne.x7thm1;
        }
        let ep = osc.eccentricity;
        let xincp = osc.inclination;
        let argpp = osc.argument_of_perigee;
        let nodep = osc.node;
        let mp = osc.mean_anomaly;

        // Long-period periodics.
        let axnl = ep * argpp.cos();
        let temp = 1.0 / (am * (1.0 - ep * ep));
        let aynl = ep * argpp.sin() + temp * aycof;
        let xl = mp + argpp + nodep + temp * xlcof * axnl;

        // Kepler's equation.
        let u = (xl - nodep) % TAU;
        let mut eo1 = u;
        let mut tem5: f64 = 9999.9;
        let mut ktr = 1;
        while tem5.abs() >= 1.0e-12 && ktr <= 10 {
            let sineo1 = eo1.sin();
            let coseo1 = eo1.cos();
            tem5 = 1.0 - coseo1 * axnl - sineo1 * aynl;
            tem5 = (u - aynl * coseo1 + axnl * sineo1 - eo1) / tem5;
            if tem5.abs() >= 0.95 {
                tem5 = 0.95_f64.copysign(tem5);
            }
            eo1 += tem5;
            ktr += 1;
        }

        // Short-period periodics.
        let sineo1 = eo1.sin();
        let coseo1 = eo1.cos();
        let ecose = axnl * coseo1 + aynl * sineo1;
        let esine = axnl * sineo1 - aynl * coseo1;
        let el2 = axnl * axnl + aynl * aynl;
        let pl = am * (1.0 - el2);
        if pl < 0.0 {
            return Err(PropagationError::SemiLatusRectum(pl));
        }
        let rl = am * (1.0 - ecose);
        let rdotl = am.sqrt() * esine / rl;
        let rvdotl = pl.sqrt() / rl;
        let betal = (1.0 - el2).sqrt();
        let temp = esine / (1.0 + betal);
        let sinu = am / rl * (sineo1 - aynl - axnl * temp);
        let cosu = am / rl * (coseo1 - axnl + aynl * temp);
        let su = sinu.atan2(cosu);
        let sin2u = (cosu + cosu) * sinu;
        let cos2u = 1.0 - 2.0 * sinu * sinu;
        let temp = 1.0 / pl;
        let temp1 = 0.5 * g.j2 * temp;
        let temp2 = temp1 * temp;

        let mrt = rl * (1.0 - 1.5 * temp2 * betal * con41) + 0.5 * temp1 * x1mth2 * cos2u;
        let su = su - 0.25 * temp2 * x7thm1 * sin2u;
        let xnode = nodep + 1.5 * temp2 * cosip * sin2u;
        let xinc = xincp + 1.5 * temp2 * cosip * sinip * cos2u;
        let mvt = rdotl - nm * temp1 * x1mth2 * sin2u / g.xke;
        let rvdot = rvdotl + nm * temp1 * (x1mth2 * cos2u + 1.5 * con41) / g.xke;

        // Orientation vectors.
        let (sinsu, cossu) = su.sin_cos();
        let (snod, cnod) = xnode.sin_cos();
        let (sini, cosi) = xinc.sin_cos();
        let xmx = -snod * cosi;
        let xmy = cnod * cosi;
        let ux = xmx * sinsu + cnod * cossu;
        let uy = xmy * sinsu + snod * cossu;
        let uz = sini * sinsu;
        let vx = xmx * cossu - cnod * sinsu;
        let vy = xmy * cossu - snod * sinsu;
        let vz = sini * cossu;

        let mr = mrt * g.radius;
        let position = [mr * ux, mr * uy, mr * uz];
        let velocity = [
            (mvt * ux + rvdot * vx) * vkmpersec,
            (mvt * uy + rvdot * vy) * vkmpersec,
            (mvt * uz + rvdot * vz) * vkmpersec,
        ];

        if position.iter().chain(velocity.iter()).any(|c| !c.is_finite()) {
            return Err(PropagationError::NonFinite);
        }
        if mrt < 1.0 {
            return Err(PropagationError::Decayed(mrt));
        }

        Ok(PropagationResult { position, velocity })
    }
}

fn long_period_coefficient(j3oj2: f64, sini: f64, cosi: f64) -> f64 {
    // Avoid the singularity at i = 180 deg.
    if (cosi + 1.0).abs() > 1.5e-12 {
        -0.25 * j3oj2 * sini * (3.0 + 5.0 * cosi) / (1.0 + cosi)
    } else {
        -0.25 * j3oj2 * sini * (3.0 + 5.0 * cosi) / TEMP4
    }
}

/// Sidereal time at epoch as computed by the operational code, from days since 1950.
fn afspc_sidereal_time(epoch: f64) -> f64 {
    const C1: f64 = 1.72027916940703639e-2;
    const THGR70: f64 = 1.7321343856509374;
    const FK5R: f64 = 5.07551419432269442e-15;

    let c1p2p = C1 + TAU;
    let ts70 = epoch - 7305.0;
    let ds70 = (ts70 + 1.0e-8).floor();
    let tfrac = ts70 - ds70;
    let gsto = (THGR70 + C1 * ds70 + c1p2p * tfrac + ts70 * ts70 * FK5R) % TAU;
    if gsto < 0.0 {
        gsto + TAU
    } else {
        gsto
    }
}
