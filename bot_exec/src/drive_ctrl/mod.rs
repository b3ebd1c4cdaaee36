//! Drive control module
//!
//! Converts driver demands, vision samples and odometry into one chassis velocity command per
//! cycle. Drive control is made up of:
//!
//! - `VelocityRamper` - limits how fast the translational speed can build up.
//! - `HeadingHold` - holds the heading still when no rotation is demanded.
//! - `TargetBearing` - turns the chassis to face the target when adjusting.
//! - `SwerveKinematics` - per-module demands and the module angle readiness check.
//! - `DriveCtrl` - the arbiter which chooses between all of the above each cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod heading_hold;
mod kinematics;
mod params;
mod ramp;
mod state;
mod target_bearing;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use heading_hold::*;
pub use kinematics::*;
pub use params::*;
pub use ramp::*;
pub use state::*;
pub use target_bearing::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of cycles the ramp takes to build up to the demanded speed from rest.
pub const RAMP_STEPS: f64 = 20.0;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drive control parameters: {0}")]
    InvalidParams(String),

    #[error("Could not initialise the drive control archives: {0}")]
    ArchiveError(util::archive::ArchiveError),

    #[error("DriveCtrl must be initialised before processing")]
    NotInitialised,
}
