//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use comms_if::eqpt::drive::NUM_MODULES;

use super::{DriveCtrlError, PidGains};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- TIMING ----

    /// Period of the control loop the controllers run in.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    // ---- HEADING HOLD ----

    /// Heading hold controller gains, tolerance in radians.
    pub heading: PidGains,

    /// Time after rotation stops during which the heading setpoint keeps following the live
    /// heading before it is frozen.
    ///
    /// Units: seconds
    pub drift_period_s: f64,

    // ---- TARGET ADJUST ----

    /// Target adjust (and turn to angle) controller gains, tolerance in radians.
    pub adjust: PidGains,

    /// Angle between the geometric bearing to the target and the bearing the chassis must
    /// face for cargo to be released toward the target.
    ///
    /// Units: radians
    pub cargo_release_offset_rad: f64,

    // ---- SPEED ----

    /// Reference maximum translational speed of the chassis.
    ///
    /// Units: meters/second
    pub max_velocity_ms: f64,

    /// Restraint on the extra rotation demand added at speed. Larger values add less.
    pub rotational_addition_restraint: f64,

    // ---- GEOMETRY ----

    /// Position of each swerve module in the robot body frame (X forward, Y left).
    ///
    /// Units: meters
    pub module_pos_m: [[f64; 2]; NUM_MODULES],

    /// Module angle error below which a module is considered to have reached its demand.
    ///
    /// Units: radians
    pub module_angle_tolerance_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), DriveCtrlError> {
        let positive = [
            ("cycle_period_s", self.cycle_period_s),
            ("drift_period_s", self.drift_period_s),
            ("max_velocity_ms", self.max_velocity_ms),
            ("rotational_addition_restraint", self.rotational_addition_restraint),
            ("module_angle_tolerance_rad", self.module_angle_tolerance_rad),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(DriveCtrlError::InvalidParams(format!(
                    "{} must be positive, found {}", name, value
                )))
            }
        }

        if !self.cargo_release_offset_rad.is_finite() {
            return Err(DriveCtrlError::InvalidParams(String::from(
                "cargo_release_offset_rad must be finite"
            )))
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            heading: PidGains {
                k_p: 5.0,
                k_i: 0.0,
                k_d: 0.0,
                tolerance: 2f64.to_radians(),
            },
            drift_period_s: 0.2,
            adjust: PidGains {
                k_p: 4.0,
                k_i: 0.0,
                k_d: 0.1,
                tolerance: 3f64.to_radians(),
            },
            cargo_release_offset_rad: 5f64.to_radians(),
            max_velocity_ms: 4.0,
            rotational_addition_restraint: 3.0,
            module_pos_m: [
                [0.3, 0.3],
                [0.3, -0.3],
                [-0.3, 0.3],
                [-0.3, -0.3],
            ],
            module_angle_tolerance_rad: 10f64.to_radians(),
        }
    }
}
