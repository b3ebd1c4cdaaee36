//! # Shooter model
//!
//! Maps the distance to the target and the hood position to a launcher velocity setpoint, and
//! resolves which distance source a shot should use.
//!
//! The model is a pure function of its calibration: piecewise linear interpolation between
//! calibrated points, clamped to the end points outside the calibrated range.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::Serialize;

use comms_if::eqpt::{launcher::Hood, vision::VisionSample};
use util::maths::interp_clamped;

pub use params::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ShooterModel {
    closed: Vec<(f64, f64)>,
    open: Vec<(f64, f64)>,
}

/// Everything the setpoint can be resolved from.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetpointInputs {
    /// Operator override, used as is if set.
    pub hard_coded: Option<f64>,

    /// Latest vision sample.
    pub vision: VisionSample,

    /// Distance to the target computed from odometry.
    ///
    /// Units: meters
    pub odometry_distance_m: f64,

    pub hood: Hood,
}

/// The launcher setpoint captured when a shot starts.
///
/// Passed by value to the cargo flow every cycle of the shot so that it sees exactly the
/// setpoint the launcher was commanded with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ShotSnapshot {
    pub setpoint: f64,

    /// Distance the setpoint was computed from, `None` for hard coded setpoints.
    ///
    /// Units: meters
    pub distance_m: Option<f64>,

    pub hood: Hood,

    pub source: SetpointSource,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetpointSource {
    HardCoded,
    Vision,
    Odometry,
}

#[derive(Debug, thiserror::Error)]
pub enum ShooterModelError {
    #[error("The {0:?} hood calibration has no points")]
    EmptyTable(Hood),

    #[error("The {0:?} hood calibration must have strictly increasing distances")]
    UnsortedTable(Hood),

    #[error("The {0:?} hood calibration contains a non-finite value")]
    NonFinite(Hood),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SetpointSource {
    fn default() -> Self {
        SetpointSource::Odometry
    }
}

impl ShooterModel {
    /// Build the model from the calibration, checking each table is usable.
    pub fn new(params: &Params) -> Result<Self, ShooterModelError> {
        Ok(Self {
            closed: build_table(&params.closed, Hood::Closed)?,
            open: build_table(&params.open, Hood::Open)?,
        })
    }

    /// The launcher setpoint for a target at `distance_m` with the given hood position.
    pub fn setpoint(&self, distance_m: f64, hood: Hood) -> f64 {
        let table = match hood {
            Hood::Closed => &self.closed,
            Hood::Open => &self.open,
        };

        // Tables are checked non-empty at construction
        interp_clamped(table, distance_m).unwrap_or(0.0)
    }

    /// Resolve the shot setpoint.
    ///
    /// In priority order: the hard coded velocity, the vision distance if vision has the
    /// target, then the odometry distance.
    pub fn resolve(&self, inputs: &SetpointInputs) -> ShotSnapshot {
        let (setpoint, distance_m, source) = match inputs.hard_coded {
            Some(v) => (v, None, SetpointSource::HardCoded),
            None => {
                let (d, source) = match inputs.vision.distance_m() {
                    Some(d) => (d, SetpointSource::Vision),
                    None => (inputs.odometry_distance_m, SetpointSource::Odometry),
                };
                (self.setpoint(d, inputs.hood), Some(d), source)
            }
        };

        debug!(
            "Shot setpoint {:.1} from {:?} (distance {:?}, hood {:?})", 
            setpoint, source, distance_m, inputs.hood
        );

        ShotSnapshot {
            setpoint,
            distance_m,
            hood: inputs.hood,
            source,
        }
    }
}

fn build_table(points: &[[f64; 2]], hood: Hood) -> Result<Vec<(f64, f64)>, ShooterModelError> {
    if points.is_empty() {
        return Err(ShooterModelError::EmptyTable(hood));
    }

    if points.iter().any(|p| !(p[0].is_finite() && p[1].is_finite())) {
        return Err(ShooterModelError::NonFinite(hood));
    }

    if points.windows(2).any(|w| w[1][0] <= w[0][0]) {
        return Err(ShooterModelError::UnsortedTable(hood));
    }

    Ok(points.iter().map(|p| (p[0], p[1])).collect())
}

#[cfg(test)]
mod test {
    use super::*;

    fn model() -> ShooterModel {
        ShooterModel::new(&Params::default()).unwrap()
    }

    #[test]
    fn test_calibrated_points() {
        let m = model();
        assert_eq!(m.setpoint(4.0, Hood::Closed), 3400.0);
        assert_eq!(m.setpoint(4.0, Hood::Open), 3550.0);

        // Halfway between 3 and 4 m
        assert!((m.setpoint(3.5, Hood::Closed) - 3275.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let m = model();
        assert_eq!(m.setpoint(0.0, Hood::Closed), 2600.0);
        assert_eq!(m.setpoint(-3.0, Hood::Closed), 2600.0);
        assert_eq!(m.setpoint(100.0, Hood::Closed), 4050.0);
        assert_eq!(m.setpoint(100.0, Hood::Open), 4750.0);
    }

    #[test]
    fn test_deterministic_and_monotonic() {
        let m = model();
        let mut prev = m.setpoint(0.0, Hood::Open);
        for i in 0..100 {
            let d = i as f64 * 0.1;
            let v = m.setpoint(d, Hood::Open);
            assert_eq!(v, m.setpoint(d, Hood::Open));
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_invalid_tables() {
        let mut p = Params::default();
        p.open.clear();
        assert!(matches!(ShooterModel::new(&p), Err(ShooterModelError::EmptyTable(Hood::Open))));

        let mut p = Params::default();
        p.closed.swap(0, 1);
        assert!(matches!(
            ShooterModel::new(&p), 
            Err(ShooterModelError::UnsortedTable(Hood::Closed))
        ));

        let mut p = Params::default();
        p.closed[2][1] = f64::NAN;
        assert!(matches!(ShooterModel::new(&p), Err(ShooterModelError::NonFinite(_))));
    }

    #[test]
    fn test_resolve_priority() {
        let m = model();
        let vision = VisionSample { has_target: true, distance_m: 2.0, bearing_deg: None };

        let mut inputs = SetpointInputs {
            hard_coded: Some(1234.0),
            vision,
            odometry_distance_m: 4.0,
            hood: Hood::Closed,
        };

        let s = m.resolve(&inputs);
        assert_eq!(s.source, SetpointSource::HardCoded);
        assert_eq!(s.setpoint, 1234.0);
        assert_eq!(s.distance_m, None);

        inputs.hard_coded = None;
        let s = m.resolve(&inputs);
        assert_eq!(s.source, SetpointSource::Vision);
        assert_eq!(s.setpoint, 2900.0);

        inputs.vision.has_target = false;
        let s = m.resolve(&inputs);
        assert_eq!(s.source, SetpointSource::Odometry);
        assert_eq!(s.setpoint, 3400.0);
        assert_eq!(s.distance_m, Some(4.0));
    }
}
