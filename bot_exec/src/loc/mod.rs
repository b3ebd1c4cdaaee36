//! # Localisation module
//!
//! Odometry is computed externally, this module provides the pose representation the
//! controllers consume and the known field geometry they aim at.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and heading in the field frame) of the robot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the field frame.
    ///
    /// Units: meters
    pub position_m: [f64; 2],

    /// Heading, the angle from the field X+ axis to the robot's forward axis, positive
    /// anticlockwise.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Known field geometry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FieldParams {
    /// Position of the target (the hub) in the field frame.
    ///
    /// Units: meters
    pub target_pos_m: [f64; 2],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: [x_m, y_m],
            heading_rad,
        }
    }

    /// Position as a vector.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.position_m[0], self.position_m[1])
    }

    /// Vector from the robot to the given field point.
    pub fn vector_to(&self, point_m: &[f64; 2]) -> Vector2<f64> {
        Vector2::new(point_m[0], point_m[1]) - self.position()
    }

    /// Field frame bearing from the robot to the given point.
    ///
    /// Units: radians
    pub fn bearing_to(&self, point_m: &[f64; 2]) -> f64 {
        let diff = self.vector_to(point_m);
        diff[1].atan2(diff[0])
    }

    /// Straight line distance from the robot to the given point.
    ///
    /// Units: meters
    pub fn distance_to(&self, point_m: &[f64; 2]) -> f64 {
        self.vector_to(point_m).norm()
    }
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            target_pos_m: [3.0, 3.0],
        }
    }
}
