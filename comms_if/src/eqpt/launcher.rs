//! # Launcher Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands for the launcher wheel's own closed loop.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct LauncherDems {
    /// Target wheel velocity, or `None` to let the wheel coast.
    ///
    /// Units: launcher velocity units (same as `LauncherSens::velocity`)
    pub setpoint: Option<f64>,

    /// Demanded hood position.
    pub hood: Hood,
}

/// Launcher sensing data.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct LauncherSens {
    /// Measured wheel velocity.
    pub velocity: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Position of the launcher hood, each position has its own calibration curve.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hood {
    Closed,
    Open,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Hood {
    fn default() -> Self {
        Hood::Closed
    }
}

impl Hood {
    /// Build from the "hood open" flag.
    pub fn from_open(open: bool) -> Self {
        match open {
            true => Hood::Open,
            false => Hood::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        *self == Hood::Open
    }

    /// The other hood position.
    pub fn toggled(&self) -> Self {
        match self {
            Hood::Open => Hood::Closed,
            Hood::Closed => Hood::Open,
        }
    }
}
