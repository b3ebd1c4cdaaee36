//! # Plant simulation
//!
//! A simple in-process model of the robot used in place of real equipment. It produces the
//! same sensor data the controllers would read from hardware and consumes their demands.
//!
//! The model is deliberately crude:
//! - The chassis follows its command exactly, scaled down by how well the modules are aligned,
//!   plus a heading disturbance proportional to the distance travelled.
//! - Modules slew toward their demanded angles at a fixed rate.
//! - The launcher wheel is a first order lag toward its setpoint.
//! - Cargo sits on a belt measured along the conveyor from its entry, moving with conveyor
//!   power. Two beam sensor windows lie either side of the gate and cargo past the launcher
//!   position is launched. Cargo reversed back past the entry is ejected.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use serde::{Deserialize, Serialize};

use comms_if::eqpt::{
    cargo::{BeamSens, ConveyorDems},
    drive::{DriveDems, DriveMode, DriveSens, NUM_MODULES},
    launcher::{LauncherDems, LauncherSens},
    vision::VisionSample,
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{get_ang_dist, wrap_pi},
    session::Session,
};

use crate::drive_ctrl::reversible_error;
use crate::loc::{FieldParams, Pose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated plant.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Pose at the start of the simulation.
    pub initial_pose: Pose,

    /// Heading disturbance per meter travelled.
    ///
    /// Units: radians/meter
    pub heading_drift_rad_per_m: f64,

    /// Maximum module steer rate.
    ///
    /// Units: radians/second
    pub module_slew_rads: f64,

    /// Launcher wheel time constant.
    ///
    /// Units: seconds
    pub launcher_time_const_s: f64,

    /// Belt speed at full conveyor power.
    ///
    /// Units: meters/second
    pub conveyor_speed_ms: f64,

    /// Start positions of the cargo on the belt.
    ///
    /// Units: meters
    pub cargo_pos_m: Vec<f64>,

    /// Belt span covered by the pre-gate beam.
    ///
    /// Units: meters
    pub pre_gate_window_m: [f64; 2],

    /// Belt span covered by the post-gate beam.
    ///
    /// Units: meters
    pub post_gate_window_m: [f64; 2],

    /// Belt position at which cargo leaves the robot.
    ///
    /// Units: meters
    pub launch_pos_m: f64,

    /// Half angle of the vision camera's field of view.
    ///
    /// Units: radians
    pub vision_half_fov_rad: f64,

    /// Maximum distance at which vision can see the target.
    ///
    /// Units: meters
    pub vision_range_m: f64,
}

/// The simulated plant.
pub struct SimPlant {
    params: SimParams,

    target_pos_m: [f64; 2],

    pose: Pose,

    module_angles_rad: [f64; NUM_MODULES],

    launcher_velocity: f64,

    cargo_pos_m: Vec<f64>,

    num_launched: u64,

    /// Cargo backed out of the conveyor entry.
    num_ejected: u64,

    time_s: f64,

    arch_truth: Archiver,
}

/// Everything the plant's sensors report in one cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimSens {
    pub pose: Pose,
    pub drive: DriveSens,
    pub beams: BeamSens,
    pub launcher: LauncherSens,
    pub vision: VisionSample,
}

#[derive(Debug, Serialize)]
struct TruthRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    heading_rad: f64,
    launcher_velocity: f64,
    cargo_on_belt: usize,
    num_launched: u64,
    num_ejected: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_pose: Pose::default(),
            heading_drift_rad_per_m: 0.02,
            module_slew_rads: 12.0,
            launcher_time_const_s: 0.4,
            conveyor_speed_ms: 0.5,
            cargo_pos_m: vec![0.6, 0.3],
            pre_gate_window_m: [0.85, 0.95],
            post_gate_window_m: [1.0, 1.05],
            launch_pos_m: 1.1,
            vision_half_fov_rad: 30f64.to_radians(),
            vision_range_m: 8.0,
        }
    }
}

impl SimPlant {
    pub fn new(params: SimParams, field: &FieldParams) -> Self {
        let mut cargo_pos_m = params.cargo_pos_m.clone();

        // Furthest along first
        cargo_pos_m.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            pose: params.initial_pose,
            target_pos_m: field.target_pos_m,
            module_angles_rad: [0.0; NUM_MODULES],
            launcher_velocity: 0.0,
            cargo_pos_m,
            num_launched: 0,
            num_ejected: 0,
            time_s: 0.0,
            arch_truth: Archiver::default(),
            params,
        }
    }

    /// Archive the true plant state into the session.
    pub fn with_archive(mut self, session: &Session) -> Result<Self, ArchiveError> {
        self.arch_truth = Archiver::from_path(session, "sim/truth.csv")?;
        Ok(self)
    }

    /// Read all sensors.
    pub fn sense(&self) -> SimSens {
        let in_window = |w: &[f64; 2]| self.cargo_pos_m.iter().any(|p| *p >= w[0] && *p <= w[1]);

        SimSens {
            pose: self.pose,
            drive: DriveSens {
                module_angles_rad: self.module_angles_rad,
            },
            beams: BeamSens {
                pre_gate: in_window(&self.params.pre_gate_window_m),
                post_gate: in_window(&self.params.post_gate_window_m),
            },
            launcher: LauncherSens {
                velocity: self.launcher_velocity,
            },
            vision: self.vision(),
        }
    }

    /// Apply one cycle's demands for `dt_s` seconds.
    pub fn actuate(
        &mut self,
        dt_s: f64,
        drive: &DriveDems,
        conveyor: &ConveyorDems,
        launcher: &LauncherDems,
    ) {
        self.time_s += dt_s;
        self.step_drive(dt_s, drive);
        self.step_launcher(dt_s, launcher);
        self.step_cargo(dt_s, conveyor);
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn num_launched(&self) -> u64 {
        self.num_launched
    }

    pub fn num_ejected(&self) -> u64 {
        self.num_ejected
    }

    pub fn cargo_remaining(&self) -> usize {
        self.cargo_pos_m.len()
    }

    fn vision(&self) -> VisionSample {
        let distance_m = self.pose.distance_to(&self.target_pos_m);
        let yaw_rad = get_ang_dist(self.pose.bearing_to(&self.target_pos_m), self.pose.heading_rad);

        match yaw_rad.abs() <= self.params.vision_half_fov_rad 
            && distance_m <= self.params.vision_range_m 
        {
            true => VisionSample {
                has_target: true,
                distance_m,
                bearing_deg: Some(yaw_rad.to_degrees()),
            },
            false => VisionSample::default(),
        }
    }

    fn step_drive(&mut self, dt_s: f64, drive: &DriveDems) {
        // Modules slew toward their demands
        let max_step = self.params.module_slew_rads * dt_s;
        for (meas, dem) in self.module_angles_rad.iter_mut().zip(drive.modules.iter()) {
            let err = get_ang_dist(*meas, dem.angle_rad);
            *meas = wrap_pi(*meas + err.max(-max_step).min(max_step));
        }

        if let DriveMode::Terminate = drive.mode {
            return;
        }

        // Misaligned modules fight each other, scale the motion by the mean alignment
        let alignment = self.module_angles_rad.iter()
            .zip(drive.modules.iter())
            .map(|(meas, dem)| reversible_error(*meas, dem.angle_rad).cos().max(0.0))
            .sum::<f64>() / NUM_MODULES as f64;

        let cmd = drive.cmd;
        let h = self.pose.heading_rad;
        let vx = cmd.forward_ms * h.cos() - cmd.strafe_ms * h.sin();
        let vy = cmd.forward_ms * h.sin() + cmd.strafe_ms * h.cos();
        let dist_m = cmd.translation_ms() * alignment * dt_s;

        self.pose.position_m[0] += vx * alignment * dt_s;
        self.pose.position_m[1] += vy * alignment * dt_s;
        self.pose.heading_rad = wrap_pi(
            h + cmd.rotation_rads * alignment * dt_s 
                + self.params.heading_drift_rad_per_m * dist_m
        );
    }

    fn step_launcher(&mut self, dt_s: f64, launcher: &LauncherDems) {
        let target = launcher.setpoint.unwrap_or(0.0);
        let alpha = (dt_s / self.params.launcher_time_const_s).min(1.0);
        self.launcher_velocity += (target - self.launcher_velocity) * alpha;
    }

    fn step_cargo(&mut self, dt_s: f64, conveyor: &ConveyorDems) {
        let ds_m = conveyor.power * self.params.conveyor_speed_ms * dt_s;
        for p in self.cargo_pos_m.iter_mut() {
            *p += ds_m;
        }

        // Reversed past the entry, out through the intake
        let before = self.cargo_pos_m.len();
        self.cargo_pos_m.retain(|p| *p >= 0.0);
        let ejected = (before - self.cargo_pos_m.len()) as u64;
        if ejected > 0 {
            self.num_ejected += ejected;
            info!("Sim: cargo ejected, {} ejected so far", self.num_ejected);
        }

        let launch_pos_m = self.params.launch_pos_m;
        let before = self.cargo_pos_m.len();
        self.cargo_pos_m.retain(|p| *p < launch_pos_m);
        let launched = (before - self.cargo_pos_m.len()) as u64;

        if launched > 0 {
            self.num_launched += launched;
            info!(
                "Sim: cargo launched at {:.1}, {} launched so far", 
                self.launcher_velocity, self.num_launched
            );
            if self.cargo_pos_m.is_empty() {
                debug!("Sim: conveyor empty");
            }
        }
    }
}

impl Archived for SimPlant {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_truth.serialise(TruthRecord {
            time_s: self.time_s,
            x_m: self.pose.position_m[0],
            y_m: self.pose.position_m[1],
            heading_rad: self.pose.heading_rad,
            launcher_velocity: self.launcher_velocity,
            cargo_on_belt: self.cargo_pos_m.len(),
            num_launched: self.num_launched,
            num_ejected: self.num_ejected,
        })
    }
}
