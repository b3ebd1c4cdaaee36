//! # Cargo flow module
//!
//! Feeds cargo to the launcher one ball at a time. The conveyor runs until a ball breaks the
//! pre-gate beam, stops while the ball settles against the gate, then pushes it through once
//! the settle window has passed. Nothing is fed until the launcher has reached its setpoint.
//!
//! Outside a shot the conveyor follows the operator's manual request instead, either a fixed
//! signed power or the reverse outtake.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CargoFlowError {
    #[error("Invalid cargo flow parameters: {0}")]
    InvalidParams(String),

    #[error("Could not initialise the cargo flow archives: {0}")]
    ArchiveError(util::archive::ArchiveError),

    #[error("CargoFlow must be initialised before processing")]
    NotInitialised,
}
