//! # Robot library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items
//! defined inside the robot crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cargo flow module - feeds cargo to the launcher once it's at speed
pub mod cargo_flow;

/// Data store - holds the state of the executable between and during cycles
pub mod data_store;

/// Drive control module - converts driver demands into chassis and swerve module demands
pub mod drive_ctrl;

/// Localisation module - pose representation and field geometry
pub mod loc;

/// Executable parameters
pub mod params;

/// Shooter model - launcher setpoint from distance and hood position
pub mod shooter_model;

/// Plant simulation - stands in for the robot's equipment
pub mod sim;

/// Cycle snapshot - the inputs to every controller for one cycle
pub mod snapshot;

/// Telecommand processor - applies operator commands to the data store
pub mod tc_processor;
