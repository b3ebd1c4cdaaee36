//! Implementations for the CargoFlow state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::{CargoFlowError, Params};
use crate::shooter_model::ShotSnapshot;
use comms_if::eqpt::{
    cargo::{BeamSens, ConveyorDems},
    launcher::LauncherSens
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::{State, Terminate},
    session::Session,
    time::Stopwatch
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cargo flow module state
#[derive(Default)]
pub struct CargoFlow {
    params: Option<Params>,

    /// False until the first cycle after init or terminate.
    active: bool,

    /// Feed cargo toward the gate, cleared while a ball is settling at the gate.
    get_ball_to_pre_gate: bool,

    /// Pre-gate reading on the previous cycle.
    last: bool,

    /// Set until the launcher first reaches its setpoint.
    wait: bool,

    /// Time since the ball at the gate arrived, stopped once the ball may be pushed through.
    settle_timer: Stopwatch,

    /// Time since the last ball arrived at the gate.
    delay_timer: Stopwatch,

    /// Post-gate reading on the previous cycle.
    last_post_gate: bool,

    /// Balls seen passing the post-gate sensor since init.
    cargo_released: u64,

    report: StatusReport,
    arch_report: Archiver,

    output: ConveyorDems,
    arch_output: Archiver,
}

/// Input data to cargo flow, sampled at the top of the cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Cycle timestamp.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub beams: BeamSens,

    pub launcher: LauncherSens,

    /// The setpoint the launcher was commanded with when the shot started, `None` outside a
    /// shot.
    pub shot: Option<ShotSnapshot>,

    /// Operator conveyor request, only followed outside a shot.
    pub manual: ManualConveyor,
}

/// Status report for CargoFlow processing.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    pub mode: ConveyorMode,

    pub power: f64,

    /// Waiting for the launcher to reach its setpoint.
    pub waiting: bool,

    /// Feeding cargo toward (or through) the gate.
    pub feeding: bool,

    /// A ball is settling at the gate.
    pub settling: bool,

    /// Time since the last ball reached the gate, zero before the first.
    ///
    /// Units: seconds
    pub since_gate_s: f64,

    pub setpoint: f64,
    pub velocity: f64,
    pub at_setpoint: bool,

    pub pre_gate: bool,
    pub post_gate: bool,

    pub slot: CargoSlot,

    pub cargo_released: u64,
}

#[derive(Debug, Serialize)]
struct OutputRecord {
    time_s: f64,
    power: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operator request for the conveyor outside of a shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualConveyor {
    Off,

    /// Run the conveyor at a fixed power, negative runs it backwards.
    ///
    /// Units: between -1 and +1
    Convey { power: f64 },

    /// Back cargo out through the intake at the outtake power.
    Outtake,
}

/// Which source set the conveyor power this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConveyorMode {
    Idle,
    Shot,
    Manual,
    Outtake,
}

/// Where the ball nearest the launcher is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CargoSlot {
    /// No ball seen and the conveyor is stopped.
    Empty,

    /// Conveying toward the pre-gate sensor.
    AwaitingGate,

    /// Held at the pre-gate sensor.
    AtPreGate,

    /// Being pushed through the gate into the launcher.
    Releasing,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CargoSlot {
    fn default() -> Self {
        CargoSlot::Empty
    }
}

impl Default for ManualConveyor {
    fn default() -> Self {
        ManualConveyor::Off
    }
}

impl Default for ConveyorMode {
    fn default() -> Self {
        ConveyorMode::Idle
    }
}

impl CargoSlot {
    fn derive(beams: &BeamSens, feeding: bool) -> Self {
        if beams.post_gate || (beams.pre_gate && feeding) {
            CargoSlot::Releasing
        }
        else if beams.pre_gate {
            CargoSlot::AtPreGate
        }
        else if feeding {
            CargoSlot::AwaitingGate
        }
        else {
            CargoSlot::Empty
        }
    }
}

impl State for CargoFlow {
    type InitData = Params;
    type InitError = CargoFlowError;

    type InputData = InputData;
    type OutputData = ConveyorDems;
    type StatusReport = StatusReport;
    type ProcError = CargoFlowError;

    fn init(&mut self, init_data: Self::InitData, session: Option<&Session>)
        -> Result<(), Self::InitError>
    {
        init_data.validate()?;
        self.params = Some(init_data);

        if let Some(session) = session {
            self.arch_report = Archiver::from_path(session, "cargo_flow/status_report.csv")
                .map_err(CargoFlowError::ArchiveError)?;
            self.arch_output = Archiver::from_path(session, "cargo_flow/output.csv")
                .map_err(CargoFlowError::ArchiveError)?;
        }

        self.active = false;
        self.get_ball_to_pre_gate = true;
        self.cargo_released = 0;

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let params = self.params.clone().ok_or(CargoFlowError::NotInitialised)?;

        let now_s = input_data.time_s;
        let beams = input_data.beams;
        let velocity = input_data.launcher.velocity;
        let setpoint = input_data.shot.map(|s| s.setpoint).unwrap_or(0.0);
        let at_setpoint = input_data.shot.is_some() 
            && (setpoint - velocity).abs() < params.velocity_deadband;

        let (power, mode) = match input_data.shot {
            Some(_) => {
                if !self.active {
                    self.activate(now_s, &beams);
                }
                (self.shot_power(now_s, &params, &beams), ConveyorMode::Shot)
            },
            None => {
                if self.active {
                    self.terminate(now_s);
                }
                manual_power(&params, input_data.manual)
            }
        };

        if self.wait && at_setpoint {
            info!("Launcher at setpoint ({:.1}, measured {:.1})", setpoint, velocity);
            self.wait = false;
        }

        if beams.post_gate && !self.last_post_gate {
            self.cargo_released += 1;
            info!("Cargo released ({} this session)", self.cargo_released);
        }
        self.last_post_gate = beams.post_gate;

        if mode != self.report.mode {
            debug!("Conveyor mode {:?} -> {:?}", self.report.mode, mode);
        }

        self.output = ConveyorDems { power };

        self.report = StatusReport {
            time_s: now_s,
            mode,
            power,
            waiting: self.wait,
            feeding: power > 0.0,
            settling: self.settle_timer.is_running(),
            since_gate_s: self.delay_timer.get(now_s),
            setpoint,
            velocity,
            at_setpoint,
            pre_gate: beams.pre_gate,
            post_gate: beams.post_gate,
            slot: CargoSlot::derive(&beams, power > 0.0),
            cargo_released: self.cargo_released,
        };

        trace!("CargoFlow: {:?}", self.report);

        Ok((self.output, self.report))
    }
}

impl Terminate for CargoFlow {
    fn terminate(&mut self, now_s: f64) {
        self.settle_timer.stop(now_s);
        self.delay_timer.stop(now_s);
        self.active = false;
        self.wait = false;
        self.output = ConveyorDems::stop();

        let beams = BeamSens {
            pre_gate: self.report.pre_gate,
            post_gate: self.report.post_gate,
        };
        self.report.time_s = now_s;
        self.report.mode = ConveyorMode::Idle;
        self.report.power = 0.0;
        self.report.waiting = false;
        self.report.feeding = false;
        self.report.settling = false;
        self.report.at_setpoint = false;
        self.report.slot = CargoSlot::derive(&beams, false);
    }
}

impl Archived for CargoFlow {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(OutputRecord {
            time_s: self.report.time_s,
            power: self.output.power,
        })
    }
}

impl CargoFlow {
    /// Start a shot.
    ///
    /// If a ball is already at the gate it is held there until the launcher is at speed and
    /// the settle window has passed.
    pub fn activate(&mut self, now_s: f64, beams: &BeamSens) {
        debug!("CargoFlow activated, pre-gate {}", beams.pre_gate);

        self.settle_timer.stop(now_s);
        self.delay_timer.stop(now_s);
        if beams.pre_gate {
            self.get_ball_to_pre_gate = false;
        }
        self.wait = true;
        self.last = false;
        self.last_post_gate = beams.post_gate;
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cargo_released(&self) -> u64 {
        self.cargo_released
    }

    /// Conveyor power while shooting. Nothing is fed until the launcher has been at its setpoint
    /// once, the wait is cleared by the caller.
    fn shot_power(&mut self, now_s: f64, params: &Params, beams: &BeamSens) -> f64 {
        // The cycle the launcher first reaches its setpoint still holds the conveyor
        if self.wait {
            return 0.0;
        }

        self.track_gate(now_s, params, beams.pre_gate);

        match self.get_ball_to_pre_gate {
            true => params.feed_power,
            false => 0.0,
        }
    }

    /// Pre-gate edge handling and the settle window.
    fn track_gate(&mut self, now_s: f64, params: &Params, pre_gate: bool) {
        if pre_gate {
            if !self.last {
                debug!("Cargo reached the gate");
                self.last = true;
                self.get_ball_to_pre_gate = false;
                self.settle_timer.reset(now_s);
                self.settle_timer.start(now_s);
                self.delay_timer.reset(now_s);
                self.delay_timer.start(now_s);
            }
        }
        else {
            self.last = false;

            // A ball leaving the beam inside the settle window doesn't end it
            if !self.settle_timer.is_running() {
                self.get_ball_to_pre_gate = true;
            }
        }

        if self.settle_timer.has_elapsed(now_s, params.settle_period_s) {
            debug!("Cargo settled, pushing through the gate");
            self.get_ball_to_pre_gate = true;
            self.settle_timer.reset(now_s);
            self.settle_timer.stop(now_s);
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn manual_power(params: &Params, manual: ManualConveyor) -> (f64, ConveyorMode) {
    match manual {
        ManualConveyor::Off => (0.0, ConveyorMode::Idle),
        ManualConveyor::Convey { power } if power.is_finite() => {
            (power.max(-1.0).min(1.0), ConveyorMode::Manual)
        },
        ManualConveyor::Convey { .. } => (0.0, ConveyorMode::Idle),
        ManualConveyor::Outtake => (-params.outtake_power, ConveyorMode::Outtake),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shooter_model::{self, SetpointInputs, ShooterModel};
    use comms_if::eqpt::launcher::Hood;

    const DT: f64 = 0.02;

    fn cargo_flow() -> CargoFlow {
        let mut cf = CargoFlow::default();
        cf.init(Params::default(), None).unwrap();
        cf
    }

    fn shot(setpoint: f64) -> ShotSnapshot {
        ShotSnapshot {
            setpoint,
            ..ShotSnapshot::default()
        }
    }

    fn input(time_s: f64, pre_gate: bool, velocity: f64) -> InputData {
        InputData {
            time_s,
            beams: BeamSens { pre_gate, post_gate: false },
            launcher: LauncherSens { velocity },
            shot: Some(shot(3000.0)),
            manual: ManualConveyor::Off,
        }
    }

    fn manual(time_s: f64, manual: ManualConveyor) -> InputData {
        InputData {
            time_s,
            manual,
            ..InputData::default()
        }
    }

    #[test]
    fn test_proc_before_init() {
        let mut cf = CargoFlow::default();
        assert!(matches!(cf.proc(&InputData::default()), Err(CargoFlowError::NotInitialised)));
    }

    #[test]
    fn test_waits_for_launcher() {
        let mut cf = cargo_flow();

        for i in 0..5 {
            let (out, report) = cf.proc(&input(i as f64 * DT, false, 1000.0)).unwrap();
            assert_eq!(out.power, 0.0);
            assert!(report.waiting);
        }

        // Reaches setpoint, still no power on this cycle
        let (out, report) = cf.proc(&input(0.1, false, 2990.0)).unwrap();
        assert_eq!(out.power, 0.0);
        assert!(!report.waiting);

        // Feeds from then on, even if the launcher dips
        let (out, report) = cf.proc(&input(0.12, false, 2500.0)).unwrap();
        assert_eq!(out.power, Params::default().feed_power);
        assert_eq!(report.slot, CargoSlot::AwaitingGate);
    }

    #[test]
    fn test_feed_gating() {
        let params = Params::default();
        let mut cf = cargo_flow();

        // Pseudo random pre-gate pattern with runs of different lengths
        let pattern = [
            false, false, true, true, true, false, true, false, false, false, true, true,
            true, true, true, true, true, true, true, true, true, true, true, true, false,
            true, false, true, false, false, false, false, false, false, false, false, false,
            false, false, false, false, false, false, false, true, true, true, false, false,
        ];

        let mut last_rise: Option<f64> = None;
        let mut prev = false;
        for (i, pre_gate) in pattern.iter().cycle().take(500).enumerate() {
            let t = i as f64 * DT;
            let (out, report) = cf.proc(&input(t, *pre_gate, 3000.0)).unwrap();

            if report.waiting {
                assert_eq!(out.power, 0.0);
                continue;
            }

            if *pre_gate && !prev {
                last_rise = Some(t);
            }
            prev = *pre_gate;

            // Feeding with the beam broken needs the settle window to have passed
            if out.power != 0.0 && *pre_gate {
                let rise = last_rise.unwrap();
                assert!(t - rise >= params.settle_period_s - 1e-9);
            }

            // Inside the settle window the conveyor is stopped
            if let Some(rise) = last_rise {
                if t - rise < params.settle_period_s - 1e-9 {
                    assert_eq!(out.power, 0.0, "Fed at t = {} inside window from {}", t, rise);
                }
            }
        }
    }

    #[test]
    fn test_settle_window_ignores_flicker() {
        let params = Params::default();
        let mut cf = cargo_flow();

        // At speed and feeding
        cf.proc(&input(0.0, false, 3000.0)).unwrap();
        let (out, _) = cf.proc(&input(DT, false, 3000.0)).unwrap();
        assert_eq!(out.power, params.feed_power);

        // Ball arrives, conveyor stops straight away
        let t0 = 2.0 * DT;
        let (out, report) = cf.proc(&input(t0, true, 3000.0)).unwrap();
        assert_eq!(out.power, 0.0);
        assert!(report.settling);
        assert_eq!(report.slot, CargoSlot::AtPreGate);

        // Beam flickers off inside the window, the conveyor stays stopped
        let (out, _) = cf.proc(&input(t0 + 0.1, false, 3000.0)).unwrap();
        assert_eq!(out.power, 0.0);

        // Breaking the beam again restarts the window
        let t1 = t0 + 0.12;
        let (out, _) = cf.proc(&input(t1, true, 3000.0)).unwrap();
        assert_eq!(out.power, 0.0);
        let (out, _) = cf.proc(&input(t1 + 0.2, true, 3000.0)).unwrap();
        assert_eq!(out.power, 0.0);
        let (out, _) = cf.proc(&input(t1 + 0.29, true, 3000.0)).unwrap();
        assert_eq!(out.power, 0.0);

        // Window passed, push the ball through
        let (out, report) = cf.proc(&input(t1 + 0.31, true, 3000.0)).unwrap();
        assert_eq!(out.power, params.feed_power);
        assert!(!report.settling);
        assert_eq!(report.slot, CargoSlot::Releasing);
    }

    #[test]
    fn test_ball_at_gate_on_activation() {
        let params = Params::default();
        let mut cf = cargo_flow();

        cf.proc(&input(0.0, true, 3000.0)).unwrap();
        assert!(!cf.get_ball_to_pre_gate);

        // Held for the settle window once the wait clears
        let (out, _) = cf.proc(&input(DT, true, 3000.0)).unwrap();
        assert_eq!(out.power, 0.0);

        let (out, _) = cf.proc(&input(DT + params.settle_period_s + 0.01, true, 3000.0)).unwrap();
        assert_eq!(out.power, params.feed_power);
    }

    #[test]
    fn test_counts_released_cargo() {
        let mut cf = cargo_flow();
        let mut inp = input(0.0, false, 3000.0);

        for (i, post) in [false, true, true, false, false, true, false].iter().enumerate() {
            inp.time_s = i as f64 * DT;
            inp.beams.post_gate = *post;
            cf.proc(&inp).unwrap();
        }

        assert_eq!(cf.cargo_released(), 2);
    }

    #[test]
    fn test_terminate_idempotent() {
        let mut cf = cargo_flow();

        cf.proc(&input(0.0, false, 3000.0)).unwrap();
        cf.proc(&input(DT, false, 3000.0)).unwrap();
        cf.proc(&input(2.0 * DT, true, 3000.0)).unwrap();

        cf.terminate(0.1);
        let out_1 = cf.output;
        let report_1 = format!("{:?}", cf.report);
        let settle_1 = format!("{:?}", cf.settle_timer);

        cf.terminate(0.1);
        assert_eq!(cf.output, out_1);
        assert_eq!(format!("{:?}", cf.report), report_1);
        assert_eq!(format!("{:?}", cf.settle_timer), settle_1);

        assert_eq!(out_1.power, 0.0);
        assert!(!cf.is_active());
        assert!(!cf.settle_timer.is_running());
        assert!(!cf.delay_timer.is_running());

        // Next shot starts by waiting again
        let (out, report) = cf.proc(&input(1.0, false, 0.0)).unwrap();
        assert_eq!(out.power, 0.0);
        assert!(report.waiting);
    }

    #[test]
    fn test_terminate_clears_report() {
        let mut cf = cargo_flow();

        // Waiting for the launcher
        let (_, report) = cf.proc(&input(0.0, false, 1000.0)).unwrap();
        assert!(report.waiting);
        cf.terminate(DT);
        assert!(!cf.report.waiting);

        // At speed and feeding toward the gate
        cf.proc(&input(2.0 * DT, false, 3000.0)).unwrap();
        let (_, report) = cf.proc(&input(3.0 * DT, false, 3000.0)).unwrap();
        assert!(report.at_setpoint);
        assert_eq!(report.slot, CargoSlot::AwaitingGate);
        assert_eq!(report.mode, ConveyorMode::Shot);

        cf.terminate(4.0 * DT);
        assert_eq!(cf.report.time_s, 4.0 * DT);
        assert_eq!(cf.report.mode, ConveyorMode::Idle);
        assert_eq!(cf.report.power, 0.0);
        assert!(!cf.report.waiting);
        assert!(!cf.report.feeding);
        assert!(!cf.report.at_setpoint);
        assert_eq!(cf.report.slot, CargoSlot::Empty);
    }

    #[test]
    fn test_manual_conveyor() {
        let params = Params::default();
        let mut cf = cargo_flow();

        let (out, report) = cf.proc(&manual(0.0, ManualConveyor::Off)).unwrap();
        assert_eq!(out.power, 0.0);
        assert_eq!(report.mode, ConveyorMode::Idle);

        let (out, report) = cf.proc(&manual(DT, ManualConveyor::Convey { power: 0.4 })).unwrap();
        assert_eq!(out.power, 0.4);
        assert_eq!(report.mode, ConveyorMode::Manual);
        assert!(report.feeding);
        assert!(!report.waiting);

        // Signed, clamped to full power
        let (out, _) = cf.proc(&manual(2.0 * DT, ManualConveyor::Convey { power: -2.0 })).unwrap();
        assert_eq!(out.power, -1.0);

        let (out, report) = cf.proc(&manual(3.0 * DT, ManualConveyor::Outtake)).unwrap();
        assert_eq!(out.power, -params.outtake_power);
        assert_eq!(report.mode, ConveyorMode::Outtake);
        assert!(!report.feeding);
        assert!(!cf.is_active());
    }

    #[test]
    fn test_reverse_only_outside_shot() {
        let params = Params::default();
        let mut cf = cargo_flow();

        // Outtake held through a whole shot, the shot owns the conveyor
        let pattern = [false, false, true, true, false, true, false, false];
        for (i, pre_gate) in pattern.iter().cycle().take(100).enumerate() {
            let mut inp = input(i as f64 * DT, *pre_gate, 3000.0);
            inp.manual = ManualConveyor::Outtake;
            let (out, report) = cf.proc(&inp).unwrap();
            assert!(out.power >= 0.0);
            assert_eq!(report.mode, ConveyorMode::Shot);
        }
        assert!(cf.is_active());

        // Shot over, the held request takes effect
        let t = 100.0 * DT;
        let (out, report) = cf.proc(&manual(t, ManualConveyor::Outtake)).unwrap();
        assert!(!cf.is_active());
        assert_eq!(out.power, -params.outtake_power);
        assert_eq!(report.mode, ConveyorMode::Outtake);

        // Terminate zeroes the reverse demand
        cf.terminate(t + DT);
        assert_eq!(cf.output.power, 0.0);
        assert_eq!(cf.report.power, 0.0);
        assert_eq!(cf.report.mode, ConveyorMode::Idle);
    }

    #[test]
    fn test_four_meter_closed_hood_shot() {
        let model = ShooterModel::new(&shooter_model::Params::default()).unwrap();
        let snapshot = model.resolve(&SetpointInputs {
            odometry_distance_m: 4.0,
            hood: Hood::Closed,
            ..SetpointInputs::default()
        });
        assert_eq!(snapshot.setpoint, 3400.0);

        let mut cf = cargo_flow();
        let mut inp = InputData {
            time_s: 0.0,
            beams: BeamSens::default(),
            launcher: LauncherSens { velocity: 3340.0 },
            shot: Some(snapshot),
            manual: ManualConveyor::Off,
        };

        // 60 away, outside the deadband
        let (out, report) = cf.proc(&inp).unwrap();
        assert!(report.waiting);
        assert!(!report.at_setpoint);
        assert_eq!(out.power, 0.0);

        // Exactly 50 away is still outside
        inp.time_s = DT;
        inp.launcher.velocity = 3450.0;
        let (_, report) = cf.proc(&inp).unwrap();
        assert!(report.waiting);

        // 49 away, inside
        inp.time_s = 2.0 * DT;
        inp.launcher.velocity = 3351.0;
        let (out, report) = cf.proc(&inp).unwrap();
        assert!(!report.waiting);
        assert!(report.at_setpoint);
        assert_eq!(out.power, 0.0);

        inp.time_s = 3.0 * DT;
        let (out, _) = cf.proc(&inp).unwrap();
        assert_eq!(out.power, Params::default().feed_power);
    }
}
