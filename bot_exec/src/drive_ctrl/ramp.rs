//! Translational velocity ramp

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::RAMP_STEPS;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits the rate at which the commanded translational speed can build up.
///
/// Each cycle the ramped magnitude grows by `1/RAMP_STEPS` of the requested magnitude and is
/// clamped so it never exceeds it. The direction of the request is always kept. A zero request
/// drops the ramp to zero immediately, there's no lag when stopping.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct VelocityRamper {
    /// Current ramped magnitude.
    ///
    /// Units: meters/second
    current_ms: f64,
}

/// The output of one ramp step.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RampedTranslation {
    pub forward_ms: f64,
    pub strafe_ms: f64,

    /// Magnitude of the request before ramping.
    ///
    /// Units: meters/second
    pub requested_ms: f64,

    /// Direction of the request, the angle of (forward, strafe).
    ///
    /// Units: radians
    pub direction_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityRamper {
    /// Step the ramp toward the given translational request.
    pub fn step(&mut self, forward_ms: f64, strafe_ms: f64) -> RampedTranslation {
        let requested_ms = forward_ms.hypot(strafe_ms);
        let direction_rad = strafe_ms.atan2(forward_ms);

        if requested_ms == 0.0 {
            self.current_ms = 0.0;
        }

        self.current_ms += requested_ms / RAMP_STEPS;
        if self.current_ms > requested_ms {
            self.current_ms = requested_ms;
        }

        RampedTranslation {
            forward_ms: direction_rad.cos() * self.current_ms,
            strafe_ms: direction_rad.sin() * self.current_ms,
            requested_ms,
            direction_rad,
        }
    }

    /// Current ramped magnitude.
    ///
    /// Units: meters/second
    pub fn current_ms(&self) -> f64 {
        self.current_ms
    }

    pub fn reset(&mut self) {
        self.current_ms = 0.0;
    }
}

impl RampedTranslation {
    /// Magnitude after ramping.
    pub fn magnitude_ms(&self) -> f64 {
        self.forward_ms.hypot(self.strafe_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ramp_increase_bounded_by_request() {
        let mut ramp = VelocityRamper::default();
        let requests = [
            (2.0, 0.0), (2.0, 0.0), (3.0, 4.0), (3.0, 4.0), (1.0, 0.0), (0.5, 0.5), (4.0, -3.0)
        ];

        for (f, s) in requests.iter().cycle().take(200) {
            let before = ramp.current_ms();
            let out = ramp.step(*f, *s);
            let m = out.requested_ms;
            let after = ramp.current_ms();

            // Never grows by more than m/20, never overshoots. Decreases are unbounded, a
            // lower request clamps straight down to it.
            assert!(after - before <= m / RAMP_STEPS + 1e-12);
            assert!(after <= m + 1e-12);
            assert!((out.magnitude_ms() - after).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ramp_reaches_request_in_steps() {
        let mut ramp = VelocityRamper::default();
        for i in 1..=20 {
            let out = ramp.step(0.0, 2.0);
            assert!((ramp.current_ms() - 0.1 * i as f64).abs() < 1e-9);

            // Direction is kept
            assert!(out.forward_ms.abs() < 1e-12);
            assert!(out.strafe_ms > 0.0);
        }
        ramp.step(0.0, 2.0);
        assert!((ramp.current_ms() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_collapse() {
        let mut ramp = VelocityRamper::default();
        for _ in 0..10 {
            ramp.step(3.0, 0.0);
        }
        assert!(ramp.current_ms() > 1.0);

        let out = ramp.step(0.0, 0.0);
        assert_eq!(ramp.current_ms(), 0.0);
        assert_eq!(out.forward_ms, 0.0);
        assert_eq!(out.strafe_ms, 0.0);
    }

    #[test]
    fn test_lower_request_clamps_immediately() {
        let mut ramp = VelocityRamper::default();
        for _ in 0..30 {
            ramp.step(3.0, 0.0);
        }
        ramp.step(1.0, 0.0);
        assert!((ramp.current_ms() - 1.0).abs() < 1e-12);
    }
}
