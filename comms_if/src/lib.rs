//! # Communications interface crate.
//!
//! Provides the common interface types shared between the controllers, the equipment they
//! drive and the operator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator telecommands
pub mod tc;

/// Demand and sensing definitions for equipment (drivetrain, conveyor, launcher, vision)
pub mod eqpt;
