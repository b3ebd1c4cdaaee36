//! Parameters structure for the shooter model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Launcher calibration, one curve per hood position.
///
/// Each curve is a list of `[distance, velocity]` points with distance in meters, sorted by
/// strictly increasing distance.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    pub closed: Vec<[f64; 2]>,
    pub open: Vec<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            closed: vec![
                [1.0, 2600.0],
                [2.0, 2900.0],
                [3.0, 3150.0],
                [4.0, 3400.0],
                [5.0, 3700.0],
                [6.0, 4050.0],
            ],
            open: vec![
                [2.0, 3000.0],
                [3.0, 3250.0],
                [4.0, 3550.0],
                [5.0, 3900.0],
                [6.0, 4300.0],
                [7.0, 4750.0],
            ],
        }
    }
}
