//! # Vision Interface
//!
//! Target detection is performed externally, the robot only consumes the resolved samples.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single sample from the vision module.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct VisionSample {
    /// True if the target is currently in view.
    pub has_target: bool,

    /// Distance from the robot to the target.
    ///
    /// Units: meters
    pub distance_m: f64,

    /// Yaw of the target relative to the robot's heading, positive when the target is to the
    /// robot's right (so that `target bearing = heading - yaw`).
    ///
    /// Units: degrees
    pub bearing_deg: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionSample {
    /// The target yaw in radians, only if the target is in view and the yaw was resolved.
    pub fn bearing_rad(&self) -> Option<f64> {
        match self.has_target {
            true => self.bearing_deg.map(f64::to_radians),
            false => None,
        }
    }

    /// The distance to the target, only if the target is in view.
    pub fn distance_m(&self) -> Option<f64> {
        match self.has_target {
            true => Some(self.distance_m),
            false => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bearing_requires_target() {
        let mut s = VisionSample {
            has_target: false,
            distance_m: 3.0,
            bearing_deg: Some(90.0),
        };
        assert_eq!(s.bearing_rad(), None);
        assert_eq!(s.distance_m(), None);

        s.has_target = true;
        assert!((s.bearing_rad().unwrap() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(s.distance_m(), Some(3.0));

        s.bearing_deg = None;
        assert_eq!(s.bearing_rad(), None);
    }
}
