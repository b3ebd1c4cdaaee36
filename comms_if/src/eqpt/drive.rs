//! # Drivetrain Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of swerve modules on the drivetrain.
pub const NUM_MODULES: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity demand for the whole chassis.
///
/// Produced once per cycle by drive control and consumed immediately by the drivetrain, it is
/// never retained between cycles.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ChassisVelocityCommand {
    /// Speed along the robot's forward axis.
    ///
    /// Units: meters/second
    pub forward_ms: f64,

    /// Speed along the robot's left axis.
    ///
    /// Units: meters/second
    pub strafe_ms: f64,

    /// Rate of turn about the robot's Z+ (upwards) axis, positive to the left.
    ///
    /// Units: radians/second
    pub rotation_rads: f64,
}

/// The demanded (or measured) state of a single swerve module.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ModuleState {
    /// Wheel ground speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Steer angle relative to the robot's forward axis.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// Demands sent to the drivetrain each cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DriveDems {
    /// How the drivetrain shall apply the demand
    pub mode: DriveMode,

    /// The chassis level demand
    pub cmd: ChassisVelocityCommand,

    /// Per-module demands matching `cmd` and `mode`
    pub modules: [ModuleState; NUM_MODULES],
}

/// Drivetrain sensing data read at the top of each cycle.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct DriveSens {
    /// Measured steer angle of each module.
    ///
    /// Units: radians
    pub module_angles_rad: [f64; NUM_MODULES],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The way the drivetrain should execute a demand.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// All outputs zero, modules hold their angles.
    Terminate,

    /// Module speeds applied directly.
    Default,

    /// Module speeds scaled down by the module angle error, used while the modules swing to
    /// their demanded angles from rest.
    ErrorRelative,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ChassisVelocityCommand {
    /// Create a new command.
    pub fn new(forward_ms: f64, strafe_ms: f64, rotation_rads: f64) -> Self {
        Self {
            forward_ms,
            strafe_ms,
            rotation_rads,
        }
    }

    /// Magnitude of the translational part of the command.
    pub fn translation_ms(&self) -> f64 {
        self.forward_ms.hypot(self.strafe_ms)
    }

    /// True if every component of the command is zero.
    pub fn is_zero(&self) -> bool {
        self.forward_ms == 0.0 && self.strafe_ms == 0.0 && self.rotation_rads == 0.0
    }
}

impl DriveDems {
    /// A terminate demand, all speeds zero.
    ///
    /// Module angles are kept from `hold_angles_rad` so the wheels don't snap back to zero when
    /// the chassis stops.
    pub fn terminate(hold_angles_rad: [f64; NUM_MODULES]) -> Self {
        let mut modules = [ModuleState::default(); NUM_MODULES];
        for (m, a) in modules.iter_mut().zip(hold_angles_rad.iter()) {
            m.angle_rad = *a;
        }

        Self {
            mode: DriveMode::Terminate,
            cmd: ChassisVelocityCommand::default(),
            modules,
        }
    }

    /// True if the demand will not move the robot.
    pub fn is_stopped(&self) -> bool {
        self.cmd.is_zero() && self.modules.iter().all(|m| m.speed_ms == 0.0)
    }
}

impl Default for DriveDems {
    fn default() -> Self {
        Self::terminate([0.0; NUM_MODULES])
    }
}
