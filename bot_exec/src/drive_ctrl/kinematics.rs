//! Swerve drive kinematics
//!
//! Each module sits at a fixed position in the body frame. For a chassis command
//! `(vx, vy, w)` module `i` at `(x_i, y_i)` must travel at
//!
//! ```text
//! v_i = (vx - w * y_i, vy + w * x_i)
//! ```
//!
//! which gives the module's wheel speed (the norm) and steer angle (the direction).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use nalgebra::Vector2;
use serde::Serialize;

use comms_if::eqpt::drive::{
    ChassisVelocityCommand, DriveDems, DriveMode, DriveSens, ModuleState, NUM_MODULES
};
use util::maths::{get_ang_dist, wrap_pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Module speeds below this are treated as stationary, their angle is free.
///
/// Units: meters/second
const MIN_MODULE_SPEED_MS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SwerveKinematics {
    /// Module positions in the body frame.
    ///
    /// Units: meters
    module_pos_m: [[f64; 2]; NUM_MODULES],

    /// Angle error within which a module has reached its demand.
    ///
    /// Units: radians
    tolerance_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    pub fn new(module_pos_m: [[f64; 2]; NUM_MODULES], tolerance_rad: f64) -> Self {
        Self {
            module_pos_m,
            tolerance_rad,
        }
    }

    /// Raw module demands for the given chassis command.
    ///
    /// Stationary modules keep the angle in `hold_angles_rad` rather than snapping to zero.
    pub fn module_states(
        &self, 
        cmd: &ChassisVelocityCommand, 
        hold_angles_rad: &[f64; NUM_MODULES]
    ) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];

        for i in 0..NUM_MODULES {
            let v = self.module_velocity(cmd, i);
            let speed_ms = v.norm();

            states[i] = ModuleState {
                speed_ms,
                angle_rad: match speed_ms > MIN_MODULE_SPEED_MS {
                    true => v[1].atan2(v[0]),
                    false => hold_angles_rad[i]
                }
            };
        }

        states
    }

    /// True if every module is pointing along its demand for `cmd`.
    ///
    /// A module driving backwards is equivalent to one turned through 180 degrees, so either
    /// orientation counts. A zero command is always reached.
    pub fn modules_reached_angles(
        &self, 
        cmd: &ChassisVelocityCommand, 
        sens: &DriveSens
    ) -> bool {
        if cmd.is_zero() {
            return true;
        }

        let demands = self.module_states(cmd, &sens.module_angles_rad);

        demands.iter()
            .zip(sens.module_angles_rad.iter())
            .all(|(dem, meas)| {
                dem.speed_ms <= MIN_MODULE_SPEED_MS
                    || reversible_error(*meas, dem.angle_rad).abs() < self.tolerance_rad
            })
    }

    /// Build drive demands for `cmd` in the given mode.
    ///
    /// Modules are optimised so none turns through more than 90 degrees. In `ErrorRelative`
    /// mode each speed is then scaled by `max(cos(angle error), 0)` so the chassis only moves
    /// as fast as the modules are aligned.
    pub fn demands(
        &self, 
        mode: DriveMode, 
        cmd: ChassisVelocityCommand, 
        sens: &DriveSens
    ) -> DriveDems {
        if let DriveMode::Terminate = mode {
            return DriveDems::terminate(sens.module_angles_rad);
        }

        let mut modules = self.module_states(&cmd, &sens.module_angles_rad);

        for (m, meas) in modules.iter_mut().zip(sens.module_angles_rad.iter()) {
            *m = optimise(*m, *meas);

            if let DriveMode::ErrorRelative = mode {
                let err = get_ang_dist(*meas, m.angle_rad);
                m.speed_ms *= err.cos().max(0.0);
            }
        }

        DriveDems {
            mode,
            cmd,
            modules
        }
    }

    /// Velocity of module `i` in the body frame.
    fn module_velocity(&self, cmd: &ChassisVelocityCommand, i: usize) -> Vector2<f64> {
        let [x, y] = self.module_pos_m[i];

        Vector2::new(
            cmd.forward_ms - cmd.rotation_rads * y,
            cmd.strafe_ms + cmd.rotation_rads * x
        )
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Angle error from `measured` to `demanded` treating opposite directions as equivalent.
///
/// The result lies within [-pi/2, pi/2].
pub fn reversible_error(measured_rad: f64, demanded_rad: f64) -> f64 {
    let err = get_ang_dist(measured_rad, demanded_rad);

    if err > PI / 2.0 {
        err - PI
    }
    else if err < -PI / 2.0 {
        err + PI
    }
    else {
        err
    }
}

/// Flip a module demand through 180 degrees (reversing its speed) if that is closer to the
/// measured angle.
pub fn optimise(state: ModuleState, measured_rad: f64) -> ModuleState {
    if get_ang_dist(measured_rad, state.angle_rad).abs() > PI / 2.0 {
        ModuleState {
            speed_ms: -state.speed_ms,
            angle_rad: wrap_pi(state.angle_rad + PI)
        }
    }
    else {
        state
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn kine() -> SwerveKinematics {
        SwerveKinematics::new(
            [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]], 
            10f64.to_radians()
        )
    }

    #[test]
    fn test_translation() {
        let k = kine();
        let states = k.module_states(
            &ChassisVelocityCommand::new(0.0, 2.0, 0.0), 
            &[0.0; NUM_MODULES]
        );

        for s in states.iter() {
            assert!((s.speed_ms - 2.0).abs() < 1e-12);
            assert!((s.angle_rad - FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rotation() {
        let k = kine();
        let states = k.module_states(
            &ChassisVelocityCommand::new(0.0, 0.0, 1.0), 
            &[0.0; NUM_MODULES]
        );

        // Every module is tangent to the circle through it
        let r = 0.3 * 2f64.sqrt();
        for (s, p) in states.iter().zip(k.module_pos_m.iter()) {
            assert!((s.speed_ms - r).abs() < 1e-12);
            let radial = p[1].atan2(p[0]);
            assert!((get_ang_dist(radial, s.angle_rad).abs() - FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_stationary_modules_hold_angle() {
        let k = kine();
        let hold = [0.1, 0.2, 0.3, 0.4];
        let states = k.module_states(&ChassisVelocityCommand::default(), &hold);

        for (s, h) in states.iter().zip(hold.iter()) {
            assert_eq!(s.speed_ms, 0.0);
            assert_eq!(s.angle_rad, *h);
        }
    }

    #[test]
    fn test_reached_angles() {
        let k = kine();
        let cmd = ChassisVelocityCommand::new(1.0, 0.0, 0.0);

        // Zero command always reached
        let sens = DriveSens { module_angles_rad: [1.0; NUM_MODULES] };
        assert!(k.modules_reached_angles(&ChassisVelocityCommand::default(), &sens));

        // Pointing sideways, not reached
        assert!(!k.modules_reached_angles(&cmd, &DriveSens { 
            module_angles_rad: [FRAC_PI_2; NUM_MODULES] 
        }));

        // Aligned, or reversed, is reached
        assert!(k.modules_reached_angles(&cmd, &DriveSens { 
            module_angles_rad: [0.05; NUM_MODULES] 
        }));
        assert!(k.modules_reached_angles(&cmd, &DriveSens { 
            module_angles_rad: [PI - 0.05; NUM_MODULES] 
        }));
    }

    #[test]
    fn test_error_relative_scaling() {
        let k = kine();
        let cmd = ChassisVelocityCommand::new(1.0, 0.0, 0.0);

        // 60 degree error halves the speed
        let sens = DriveSens { module_angles_rad: [60f64.to_radians(); NUM_MODULES] };
        let dems = k.demands(DriveMode::ErrorRelative, cmd, &sens);
        for m in dems.modules.iter() {
            assert!((m.speed_ms - 0.5).abs() < 1e-9);
        }

        // Default mode is unscaled
        let dems = k.demands(DriveMode::Default, cmd, &sens);
        for m in dems.modules.iter() {
            assert!((m.speed_ms - 1.0).abs() < 1e-9);
        }

        // Modules facing backwards are flipped and driven in reverse
        let sens = DriveSens { module_angles_rad: [PI; NUM_MODULES] };
        let dems = k.demands(DriveMode::ErrorRelative, cmd, &sens);
        for m in dems.modules.iter() {
            assert!((m.speed_ms + 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_terminate_demands() {
        let k = kine();
        let sens = DriveSens { module_angles_rad: [0.3; NUM_MODULES] };
        let dems = k.demands(
            DriveMode::Terminate, 
            ChassisVelocityCommand::new(1.0, 1.0, 1.0), 
            &sens
        );

        assert!(dems.is_stopped());
        assert_eq!(dems.modules[2].angle_rad, 0.3);
    }
}
