//! # Cargo Handling Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the conveyor.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ConveyorDems {
    /// Conveyor motor power, positive moves cargo toward the launcher.
    ///
    /// Units: between -1 and +1
    pub power: f64,
}

/// Beam break sensor readings along the cargo path.
///
/// `true` means a ball is breaking the beam.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BeamSens {
    /// Sensor just before the gate.
    pub pre_gate: bool,

    /// Sensor just after the gate, between the gate and the launcher wheel.
    pub post_gate: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ConveyorDems {
    /// A demand which stops the conveyor.
    pub fn stop() -> Self {
        Self { power: 0.0 }
    }
}
