//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::{
    BearingSource, DriveCtrlError, HeadingHold, Params, PidController, SwerveKinematics,
    TargetBearing, VelocityRamper
};
use crate::loc::{FieldParams, Pose};
use comms_if::{
    eqpt::{
        drive::{ChassisVelocityCommand, DriveDems, DriveMode, DriveSens, NUM_MODULES},
        vision::VisionSample
    },
    tc::JoystickAxes
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::{State, Terminate},
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
#[derive(Default)]
pub struct DriveCtrl {
    params: Params,

    ctrls: Option<Controllers>,

    mode: DriveCtrlMode,

    /// False until the first cycle after init or terminate.
    active: bool,

    /// True if the previous cycle was adjusting to the target.
    adjusting: bool,

    /// Last measured module angles, held by terminate demands.
    hold_angles_rad: [f64; NUM_MODULES],

    report: StatusReport,
    arch_report: Archiver,

    output: Option<DriveDems>,
    arch_output: Archiver,
}

/// The controllers built from the parameters at init.
struct Controllers {
    ramper: VelocityRamper,
    heading_hold: HeadingHold,
    target_bearing: TargetBearing,
    turn: PidController,
    kinematics: SwerveKinematics,
}

pub struct InitData {
    pub params: Params,
    pub field: FieldParams,
}

/// Input data to drive control, sampled at the top of the cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Cycle timestamp.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Driver demands.
    pub axes: JoystickAxes,

    /// If true the heading is driven toward the target.
    pub adjust_to_target: bool,

    /// Odometry pose.
    pub pose: Pose,

    /// Latest vision sample.
    pub vision: VisionSample,

    /// Measured drivetrain state.
    pub drive_sens: DriveSens,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    /// The arbitration path taken this cycle.
    pub path: DrivePath,

    pub requested_speed_ms: f64,
    pub ramped_speed_ms: f64,

    pub heading_rad: f64,
    pub heading_setpoint_rad: Option<f64>,
    pub heading_frozen: bool,

    pub adjust_source: Option<BearingSource>,
    pub adjust_setpoint_rad: Option<f64>,

    pub modules_ready: bool,
    pub waiting: bool,
}

/// Flattened drive demands for archiving.
#[derive(Debug, Serialize)]
struct DemsRecord {
    time_s: f64,
    mode: DriveMode,
    forward_ms: f64,
    strafe_ms: f64,
    rotation_rads: f64,
    speed_0_ms: f64,
    angle_0_rad: f64,
    speed_1_ms: f64,
    angle_1_rad: f64,
    speed_2_ms: f64,
    angle_2_rad: f64,
    speed_3_ms: f64,
    angle_3_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The path through the arbiter which produced the cycle's demands. Exactly one per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrivePath {
    /// Nothing to do, outputs zero.
    Terminate,

    /// Modules swinging to their angles from rest.
    ErrorRelative,

    /// No rotation, the heading setpoint is still following the heading.
    Drift,

    /// No rotation, the frozen heading setpoint is being held.
    HeadingHold,

    /// Rotation demanded (by the driver or the target adjust).
    Direct,

    /// Turning in place to a fixed heading.
    TurnToAngle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCtrlMode {
    /// Driver control.
    Teleop,

    /// Turning in place to `target_rad`, driver input is ignored.
    TurnToAngle {
        target_rad: f64
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DrivePath {
    fn default() -> Self {
        DrivePath::Terminate
    }
}

impl Default for DriveCtrlMode {
    fn default() -> Self {
        DriveCtrlMode::Teleop
    }
}

impl State for DriveCtrl {
    type InitData = InitData;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = DriveDems;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    fn init(&mut self, init_data: Self::InitData, session: Option<&Session>)
        -> Result<(), Self::InitError>
    {
        let params = init_data.params;
        params.validate()?;

        self.ctrls = Some(Controllers {
            ramper: VelocityRamper::default(),
            heading_hold: HeadingHold::new(
                params.heading, 
                params.cycle_period_s, 
                params.drift_period_s
            ),
            target_bearing: TargetBearing::new(
                params.adjust,
                params.cycle_period_s,
                params.cargo_release_offset_rad,
                init_data.field.target_pos_m
            ),
            turn: PidController::new_angular(params.adjust, params.cycle_period_s),
            kinematics: SwerveKinematics::new(
                params.module_pos_m, 
                params.module_angle_tolerance_rad
            ),
        });
        self.params = params;

        if let Some(session) = session {
            self.arch_report = Archiver::from_path(session, "drive_ctrl/status_report.csv")
                .map_err(DriveCtrlError::ArchiveError)?;
            self.arch_output = Archiver::from_path(session, "drive_ctrl/output.csv")
                .map_err(DriveCtrlError::ArchiveError)?;
        }

        self.mode = DriveCtrlMode::Teleop;
        self.active = false;

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let ctrls = self.ctrls.as_mut().ok_or(DriveCtrlError::NotInitialised)?;

        let now_s = input_data.time_s;
        let heading_rad = input_data.pose.heading_rad;
        let sens = &input_data.drive_sens;
        self.hold_angles_rad = sens.module_angles_rad;

        self.report = StatusReport {
            time_s: now_s,
            heading_rad,
            ..StatusReport::default()
        };

        if !self.active {
            debug!("DriveCtrl activated, heading latched at {:.4} rad", heading_rad);
            ctrls.heading_hold.activate(now_s, heading_rad);
            self.active = true;
        }

        let dems = match self.mode {
            DriveCtrlMode::TurnToAngle { target_rad } => {
                let rotation_rads = ctrls.turn.calculate(heading_rad, target_rad);
                ctrls.ramper.reset();
                ctrls.heading_hold.track(heading_rad);

                if ctrls.turn.at_setpoint() {
                    info!("Turn to {:.4} rad complete", target_rad);
                    self.mode = DriveCtrlMode::Teleop;
                    ctrls.heading_hold.set_waiting(true);
                    self.report.path = DrivePath::Terminate;
                    DriveDems::terminate(sens.module_angles_rad)
                }
                else {
                    self.report.path = DrivePath::TurnToAngle;
                    ctrls.kinematics.demands(
                        DriveMode::Default,
                        ChassisVelocityCommand::new(0.0, 0.0, rotation_rads),
                        sens
                    )
                }
            },
            DriveCtrlMode::Teleop => teleop(
                ctrls, 
                &self.params, 
                &mut self.adjusting, 
                &mut self.report, 
                input_data
            ),
        };

        self.report.heading_setpoint_rad = ctrls.heading_hold.setpoint_rad();
        self.report.heading_frozen = ctrls.heading_hold.is_frozen();
        self.report.waiting = ctrls.heading_hold.is_waiting();
        self.report.ramped_speed_ms = ctrls.ramper.current_ms();

        trace!("DriveCtrl {:?}: {:?}", self.report.path, dems.cmd);

        self.output = Some(dems);

        Ok((dems, self.report))
    }
}

impl Terminate for DriveCtrl {
    fn terminate(&mut self, now_s: f64) {
        if let Some(ref mut ctrls) = self.ctrls {
            ctrls.ramper.reset();
            ctrls.heading_hold.deactivate(now_s);
            ctrls.heading_hold.set_waiting(true);
            ctrls.target_bearing.reset();
            ctrls.turn.reset();
        }

        self.mode = DriveCtrlMode::Teleop;
        self.active = false;
        self.adjusting = false;

        self.report = StatusReport {
            time_s: now_s,
            path: DrivePath::Terminate,
            waiting: true,
            ..StatusReport::default()
        };
        self.output = Some(DriveDems::terminate(self.hold_angles_rad));
    }
}

impl Archived for DriveCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)?;

        if let Some(dems) = self.output {
            let m = &dems.modules;
            self.arch_output.serialise(DemsRecord {
                time_s: self.report.time_s,
                mode: dems.mode,
                forward_ms: dems.cmd.forward_ms,
                strafe_ms: dems.cmd.strafe_ms,
                rotation_rads: dems.cmd.rotation_rads,
                speed_0_ms: m[0].speed_ms,
                angle_0_rad: m[0].angle_rad,
                speed_1_ms: m[1].speed_ms,
                angle_1_rad: m[1].angle_rad,
                speed_2_ms: m[2].speed_ms,
                angle_2_rad: m[2].angle_rad,
                speed_3_ms: m[3].speed_ms,
                angle_3_rad: m[3].angle_rad,
            })?;
        }

        Ok(())
    }
}

impl DriveCtrl {
    /// Start turning in place to the given field heading.
    ///
    /// Driver input is ignored until the heading is within the adjust tolerance of the target,
    /// at which point the chassis stops and control returns to the driver.
    pub fn begin_turn_to_angle(&mut self, target_rad: f64) {
        info!("Turning to {:.4} rad", target_rad);

        if let Some(ref mut ctrls) = self.ctrls {
            ctrls.turn.reset();
        }
        self.mode = DriveCtrlMode::TurnToAngle { target_rad };
    }

    /// Abandon any turn in progress and return to driver control.
    pub fn abort_turn_to_angle(&mut self) {
        if let DriveCtrlMode::TurnToAngle { .. } = self.mode {
            info!("Turn to angle aborted");
            self.mode = DriveCtrlMode::Teleop;
        }
    }

    pub fn mode(&self) -> DriveCtrlMode {
        self.mode
    }

    /// The demands produced by the last call to `proc` or `terminate`.
    pub fn output(&self) -> Option<DriveDems> {
        self.output
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// One cycle of driver control.
///
/// The rules are applied in order and exactly one produces the demands:
///
/// 1. No translation, no rotation and not adjusting: terminate, drift book-keeping only.
/// 2. Adjusting: the rotation request is replaced by the target bearing correction.
/// 3. Modules not yet at their angles after rest: error relative drive at the unramped speed,
///    the heading setpoint follows the heading.
/// 4. No rotation: heading hold drift then PID.
/// 5. Otherwise direct drive, with extra rotation at speed.
fn teleop(
    ctrls: &mut Controllers,
    params: &Params,
    adjusting: &mut bool,
    report: &mut StatusReport,
    input: &InputData,
) -> DriveDems {
    let now_s = input.time_s;
    let heading_rad = input.pose.heading_rad;
    let sens = &input.drive_sens;

    let ramped = ctrls.ramper.step(input.axes.forward, input.axes.strafe);
    let mut rotation_rads = input.axes.rotation;
    report.requested_speed_ms = ramped.requested_ms;

    if rotation_rads != 0.0 {
        ctrls.heading_hold.track(heading_rad);
    }

    // Rule 1
    if ramped.requested_ms == 0.0 && rotation_rads == 0.0 && !input.adjust_to_target {
        ctrls.heading_hold.set_waiting(true);
        ctrls.heading_hold.drift(now_s, heading_rad);
        *adjusting = false;

        report.path = DrivePath::Terminate;
        report.modules_ready = true;
        return DriveDems::terminate(sens.module_angles_rad);
    }

    // Rule 2
    if input.adjust_to_target {
        if !*adjusting {
            ctrls.target_bearing.reset();
        }

        let c = ctrls.target_bearing.correction(&input.pose, &input.vision);
        rotation_rads = c.rotation_rads;
        report.adjust_source = Some(c.source);
        report.adjust_setpoint_rad = Some(c.setpoint_rad);
    }
    *adjusting = input.adjust_to_target;

    // Rule 3
    let cmd = ChassisVelocityCommand::new(ramped.forward_ms, ramped.strafe_ms, rotation_rads);
    report.modules_ready = ctrls.kinematics.modules_reached_angles(&cmd, sens);
    if report.modules_ready {
        ctrls.heading_hold.set_waiting(false);
    }

    if ctrls.heading_hold.is_waiting() {
        ctrls.heading_hold.track(heading_rad);
        report.path = DrivePath::ErrorRelative;

        return ctrls.kinematics.demands(
            DriveMode::ErrorRelative,
            ChassisVelocityCommand::new(
                ramped.direction_rad.cos() * ramped.requested_ms,
                ramped.direction_rad.sin() * ramped.requested_ms,
                rotation_rads
            ),
            sens
        );
    }

    // Rule 4
    if rotation_rads == 0.0 {
        return match ctrls.heading_hold.hold(now_s, heading_rad) {
            Some(correction_rads) => {
                report.path = DrivePath::HeadingHold;
                ctrls.kinematics.demands(
                    DriveMode::Default,
                    ChassisVelocityCommand::new(
                        ramped.forward_ms, ramped.strafe_ms, correction_rads
                    ),
                    sens
                )
            },
            None => {
                report.path = DrivePath::Drift;
                ctrls.kinematics.demands(DriveMode::Default, cmd, sens)
            }
        };
    }

    // Rule 5
    let scale = 1.0 
        + (ctrls.ramper.current_ms() / params.max_velocity_ms) 
        / params.rotational_addition_restraint;
    ctrls.heading_hold.follow(heading_rad);
    report.path = DrivePath::Direct;

    ctrls.kinematics.demands(
        DriveMode::Default,
        ChassisVelocityCommand::new(ramped.forward_ms, ramped.strafe_ms, rotation_rads * scale),
        sens
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_ctrl::RAMP_STEPS;
    use util::maths::wrap_pi;

    const DT: f64 = 0.02;

    fn drive_ctrl() -> DriveCtrl {
        let mut dc = DriveCtrl::default();
        dc.init(InitData { params: Params::default(), field: FieldParams::default() }, None)
            .unwrap();
        dc
    }

    fn input(time_s: f64, axes: JoystickAxes, heading_rad: f64) -> InputData {
        InputData {
            time_s,
            axes,
            pose: Pose::new(0.0, 0.0, heading_rad),
            ..InputData::default()
        }
    }

    fn axes(forward: f64, strafe: f64, rotation: f64) -> JoystickAxes {
        JoystickAxes { forward, strafe, rotation }
    }

    /// Module angles matching a pure forward translation.
    fn aligned() -> DriveSens {
        DriveSens { module_angles_rad: [0.0; NUM_MODULES] }
    }

    #[test]
    fn test_proc_before_init() {
        let mut dc = DriveCtrl::default();
        assert!(matches!(
            dc.proc(&InputData::default()), 
            Err(DriveCtrlError::NotInitialised)
        ));
    }

    #[test]
    fn test_idle_terminates() {
        let mut dc = drive_ctrl();

        for i in 0..10 {
            let (dems, report) = dc.proc(&input(i as f64 * DT, axes(0.0, 0.0, 0.0), 0.3))
                .unwrap();
            assert_eq!(report.path, DrivePath::Terminate);
            assert_eq!(dems.mode, DriveMode::Terminate);
            assert!(dems.is_stopped());
        }
    }

    #[test]
    fn test_stationary_freezes_setpoint_once() {
        let params = Params::default();
        let mut dc = drive_ctrl();

        // Rotate for a while first
        let mut t = 0.0;
        let mut heading = 0.0;
        for _ in 0..10 {
            let mut inp = input(t, axes(0.0, 0.0, 1.0), heading);
            inp.drive_sens = DriveSens { 
                module_angles_rad: [
                    135f64.to_radians(), 45f64.to_radians(), 
                    -135f64.to_radians(), -45f64.to_radians()
                ]
            };
            dc.proc(&inp).unwrap();
            t += DT;
            heading += 0.02;
        }

        // Then sit still for two drift periods while the heading settles
        let cycles = (2.0 * params.drift_period_s / DT).round() as usize;
        let mut setpoints = Vec::new();
        let mut freeze_count = 0;
        let mut was_frozen = false;

        for _ in 0..cycles {
            let (dems, report) = dc.proc(&input(t, axes(0.0, 0.0, 0.0), heading)).unwrap();
            assert_eq!(report.path, DrivePath::Terminate);
            assert!(dems.is_stopped());

            if report.heading_frozen && !was_frozen {
                freeze_count += 1;
            }
            was_frozen = report.heading_frozen;
            setpoints.push(report.heading_setpoint_rad.unwrap());

            t += DT;
            heading += 0.001;
        }

        assert_eq!(freeze_count, 1);
        assert!(was_frozen);

        // One distinct value after the freeze
        let frozen = *setpoints.last().unwrap();
        let first_frozen = setpoints.iter().position(|s| *s == frozen).unwrap();
        assert!(first_frozen > 0 && first_frozen < cycles - 1);
        assert!(setpoints[first_frozen..].iter().all(|s| *s == frozen));

        // Translating now holds the frozen heading
        let (dems, report) = dc.proc(&{
            let mut i = input(t, axes(1.0, 0.0, 0.0), heading);
            i.drive_sens = aligned();
            i
        }).unwrap();
        assert_eq!(report.path, DrivePath::HeadingHold);
        assert_eq!(report.heading_setpoint_rad, Some(frozen));

        // Exactly the PID correction back to the frozen setpoint
        let expected = params.heading.k_p * wrap_pi(frozen - heading);
        assert!(expected < 0.0);
        assert!(
            (dems.cmd.rotation_rads - expected).abs() < 1e-9,
            "rotation {} expected {}", dems.cmd.rotation_rads, expected
        );
    }

    #[test]
    fn test_error_relative_from_rest() {
        let mut dc = drive_ctrl();

        // Modules sideways, so forward translation must wait for them
        let mut inp = input(0.0, axes(2.0, 0.0, 0.0), 0.0);
        inp.drive_sens = DriveSens { module_angles_rad: [60f64.to_radians(); NUM_MODULES] };

        let (dems, report) = dc.proc(&inp).unwrap();
        assert_eq!(report.path, DrivePath::ErrorRelative);
        assert_eq!(dems.mode, DriveMode::ErrorRelative);
        assert!(!report.modules_ready);

        // Unramped speed, scaled by cos(60) = 0.5
        assert!((dems.cmd.forward_ms - 2.0).abs() < 1e-9);
        assert!((dems.modules[0].speed_ms - 1.0).abs() < 1e-9);

        // Modules arrive, switch to normal drive at the ramped speed
        inp.time_s = DT;
        inp.drive_sens = aligned();
        let (dems, report) = dc.proc(&inp).unwrap();
        assert!(report.modules_ready);
        assert!(!report.waiting);
        assert_eq!(dems.mode, DriveMode::Default);
        assert!((dems.cmd.forward_ms - 2.0 * 2.0 / RAMP_STEPS).abs() < 1e-9);
    }

    #[test]
    fn test_direct_rotation_scaling() {
        let params = Params::default();
        let mut dc = drive_ctrl();

        let mut inp = input(0.0, axes(2.0, 0.0, 1.0), 0.0);
        inp.drive_sens = aligned();

        // Clear the wait with a translation the modules are already aligned for
        let mut inp0 = inp;
        inp0.axes.rotation = 0.0;
        dc.proc(&inp0).unwrap();

        inp.time_s = DT;
        let (dems, report) = dc.proc(&inp).unwrap();

        // Rotation puts the modules out of alignment but the wait is already cleared
        assert_eq!(report.path, DrivePath::Direct);
        let current = 2.0 * 2.0 / RAMP_STEPS;
        let expected = 1.0 
            * (1.0 + (current / params.max_velocity_ms) / params.rotational_addition_restraint);
        assert!((dems.cmd.rotation_rads - expected).abs() < 1e-9);
        assert_eq!(report.heading_setpoint_rad, Some(0.0));
    }

    #[test]
    fn test_adjust_overrides_rotation() {
        let mut dc = drive_ctrl();

        // Adjusting with the modules pointing straight ahead, so they aren't at the point turn
        // angles the rotation needs
        let mut inp = input(0.0, axes(0.0, 0.0, 0.7), 0.0);
        inp.adjust_to_target = true;
        inp.drive_sens = aligned();
        let (dems, report) = dc.proc(&inp).unwrap();

        // Adjust is applied first, then the readiness gate picks error relative drive
        assert_eq!(report.path, DrivePath::ErrorRelative);
        assert_eq!(dems.mode, DriveMode::ErrorRelative);
        assert!(!report.modules_ready);
        assert_eq!(report.adjust_source, Some(BearingSource::Odometry));

        // Target at 45 degrees, nearer candidate is 45 - 5 degrees
        let sp = report.adjust_setpoint_rad.unwrap();
        assert!((sp - 40f64.to_radians()).abs() < 1e-9);
        assert!(dems.cmd.rotation_rads > 0.0);
        assert!((dems.cmd.rotation_rads - 0.7).abs() > 1e-3);
    }

    #[test]
    fn test_turn_to_angle() {
        let mut dc = drive_ctrl();
        dc.begin_turn_to_angle(1.0);

        // Driver input is ignored
        let (dems, report) = dc.proc(&input(0.0, axes(2.0, 0.0, 0.0), 0.0)).unwrap();
        assert_eq!(report.path, DrivePath::TurnToAngle);
        assert_eq!(dems.cmd.forward_ms, 0.0);
        assert!(dems.cmd.rotation_rads > 0.0);

        // Within tolerance, terminate and return to teleop
        let (dems, report) = dc.proc(&input(DT, axes(2.0, 0.0, 0.0), 1.0)).unwrap();
        assert_eq!(report.path, DrivePath::Terminate);
        assert!(dems.is_stopped());
        assert_eq!(dc.mode(), DriveCtrlMode::Teleop);

        dc.begin_turn_to_angle(-1.0);
        dc.abort_turn_to_angle();
        assert_eq!(dc.mode(), DriveCtrlMode::Teleop);
    }

    #[test]
    fn test_terminate_idempotent() {
        let mut dc = drive_ctrl();

        let mut inp = input(0.0, axes(2.0, 1.0, 0.5), 0.0);
        inp.drive_sens = DriveSens { module_angles_rad: [0.2; NUM_MODULES] };
        for i in 0..5 {
            inp.time_s = i as f64 * DT;
            dc.proc(&inp).unwrap();
        }
        dc.begin_turn_to_angle(2.0);

        dc.terminate(0.1);
        let out_1 = dc.output();
        let report_1 = format!("{:?}", dc.report);
        let mode_1 = dc.mode();

        dc.terminate(0.1);
        assert_eq!(dc.output(), out_1);
        assert_eq!(format!("{:?}", dc.report), report_1);
        assert_eq!(dc.mode(), mode_1);

        let out = out_1.unwrap();
        assert!(out.is_stopped());
        assert_eq!(out.mode, DriveMode::Terminate);
        assert_eq!(out.modules[0].angle_rad, 0.2);
        assert_eq!(mode_1, DriveCtrlMode::Teleop);

        // Ramp restarts from zero after terminate
        inp.time_s = 0.2;
        inp.drive_sens = aligned();
        inp.axes = axes(2.0, 0.0, 0.0);
        let (dems, _) = dc.proc(&inp).unwrap();
        assert!(dems.cmd.forward_ms <= 2.0 / RAMP_STEPS + 1e-9);
    }
}
