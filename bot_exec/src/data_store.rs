//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        cargo::ConveyorDems,
        drive::DriveDems,
        launcher::LauncherDems,
    },
    tc::JoystickAxes,
};
use log::{debug, info, warn};
use util::module::{State, Terminate};

use crate::{
    cargo_flow::{self, CargoFlow, ManualConveyor},
    drive_ctrl::{self, DriveCtrl},
    loc::FieldParams,
    shooter_model::{ShooterModel, ShotSnapshot},
    snapshot::{CycleInputs, OperatorState},
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the robot has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
    CycleOverruns,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Simulation elapsed time
    pub sim_time_s: f64,

    // Safe mode variables
    /// Determines if the robot is in safe mode.
    pub safe: bool,

    /// Gives the reason for the robot being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Inputs
    pub operator: OperatorState,
    pub inputs: CycleInputs,
    pub field: FieldParams,

    // DriveCtrl
    pub drive_ctrl: DriveCtrl,
    pub drive_dems: DriveDems,
    pub drive_ctrl_status_rpt: Option<drive_ctrl::StatusReport>,

    // Shooting
    /// Set by the shoot TC, the shot is resolved on the next controller pass.
    pub shot_requested: bool,
    pub shot: Option<ShotSnapshot>,
    pub launcher_dems: LauncherDems,

    // CargoFlow
    pub cargo_flow: CargoFlow,
    pub conveyor_dems: ConveyorDems,
    pub cargo_flow_status_rpt: Option<cargo_flow::StatusReport>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the robot into safe mode with the given cause.
    ///
    /// All controllers are terminated and the operator demands cleared.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.operator.axes = JoystickAxes::default();
            self.operator.adjust_to_target = false;
            self.operator.conveyor = ManualConveyor::Off;

            self.drive_ctrl.terminate(self.sim_time_s);
            self.drive_dems = self.drive_ctrl.output()
                .unwrap_or_else(|| DriveDems::terminate(self.inputs.drive_sens.module_angles_rad));

            self.end_shot();
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) => {
                if cause == root_cause {
                    self.safe = false;
                    self.safe_cause = None;
                    info!("Make unsafe requested, root cause match, safe mode disabled");
                    Ok(())
                } else {
                    Err(())
                }
            }
            None => Ok(()),
        }
    }

    /// Request a shot, the setpoint is resolved from the next cycle's inputs.
    pub fn start_shot(&mut self) {
        if self.shot.is_some() {
            debug!("Shot already in progress");
            return;
        }
        self.shot_requested = true;
    }

    /// Stop feeding and let the launcher coast.
    pub fn stop_shot(&mut self) {
        if self.shot.is_some() || self.shot_requested {
            info!("Shot stopped, {} cargo released", self.cargo_flow.cargo_released());
        }
        self.end_shot();
    }

    /// Perform actions required at the start of a cycle.
    pub fn cycle_start(&mut self, cycle_period_s: f64) {
        self.sim_time_s = self.num_cycles as f64 * cycle_period_s;

        self.drive_ctrl_status_rpt = None;
        self.cargo_flow_status_rpt = None;
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Run all controllers on the current cycle's inputs.
    ///
    /// In safe mode nothing is processed and the terminate demands set on entry are kept.
    pub fn proc_controllers(&mut self, shooter_model: &ShooterModel) {
        if self.safe {
            return;
        }

        // DriveCtrl processing
        match self.drive_ctrl.proc(&self.inputs.drive_ctrl_input()) {
            Ok((o, r)) => {
                self.drive_dems = o;
                self.drive_ctrl_status_rpt = Some(r);
            },
            Err(e) => {
                warn!("Error during DriveCtrl processing: {}", e);
                self.drive_dems = DriveDems::terminate(self.inputs.drive_sens.module_angles_rad);
            }
        }

        // Shooter setpoint, latched for the whole shot
        if self.shot_requested {
            self.shot_requested = false;
            let shot = shooter_model.resolve(&self.inputs.setpoint_inputs(&self.field));
            info!("Shot started, setpoint {:.1} ({:?})", shot.setpoint, shot.source);
            self.shot = Some(shot);
        }

        self.launcher_dems = LauncherDems {
            setpoint: self.shot.map(|s| s.setpoint),
            hood: self.operator.hood,
        };

        // CargoFlow processing, the only writer of conveyor power in and out of a shot
        self.conveyor_dems = match self.cargo_flow.proc(&self.inputs.cargo_flow_input(self.shot)) {
            Ok((o, r)) => {
                self.cargo_flow_status_rpt = Some(r);
                o
            },
            Err(e) => {
                warn!("Error during CargoFlow processing: {}", e);
                ConveyorDems::stop()
            }
        };
    }

    fn end_shot(&mut self) {
        self.shot_requested = false;
        self.shot = None;
        self.cargo_flow.terminate(self.sim_time_s);
        self.conveyor_dems = ConveyorDems::stop();
        self.launcher_dems.setpoint = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive_ctrl::{DrivePath, InitData},
        shooter_model::{self, SetpointSource},
        sim::{SimParams, SimPlant},
    };

    const DT: f64 = 0.02;

    fn data_store() -> (DataStore, ShooterModel) {
        let mut ds = DataStore::default();
        ds.drive_ctrl.init(
            InitData { params: drive_ctrl::Params::default(), field: FieldParams::default() }, 
            None
        ).unwrap();
        ds.cargo_flow.init(cargo_flow::Params::default(), None).unwrap();

        let model = ShooterModel::new(&shooter_model::Params::default()).unwrap();
        (ds, model)
    }

    fn run_cycle(ds: &mut DataStore, model: &ShooterModel, sim: &mut SimPlant) {
        ds.cycle_start(DT);
        ds.inputs = CycleInputs::new(ds.sim_time_s, ds.operator, &sim.sense());
        ds.proc_controllers(model);
        sim.actuate(DT, &ds.drive_dems, &ds.conveyor_dems, &ds.launcher_dems);
        ds.cycle_end();
    }

    #[test]
    fn test_make_safe_terminates() {
        let (mut ds, model) = data_store();
        let mut sim = SimPlant::new(SimParams::default(), &ds.field);

        ds.operator.axes = JoystickAxes { forward: 1.0, strafe: 0.0, rotation: 0.0 };
        ds.start_shot();
        for _ in 0..10 {
            run_cycle(&mut ds, &model, &mut sim);
        }
        assert!(ds.shot.is_some());
        assert!(!ds.drive_dems.is_stopped());

        ds.make_safe(SafeModeCause::MakeSafeTc);
        assert!(ds.drive_dems.is_stopped());
        assert_eq!(ds.conveyor_dems.power, 0.0);
        assert_eq!(ds.launcher_dems.setpoint, None);
        assert_eq!(ds.operator.axes, JoystickAxes::default());

        // Stays stopped while safe
        for _ in 0..5 {
            run_cycle(&mut ds, &model, &mut sim);
            assert!(ds.drive_dems.is_stopped());
            assert!(ds.drive_ctrl_status_rpt.is_none());
        }

        // Only the matching cause clears safe mode
        assert!(ds.make_unsafe(SafeModeCause::CycleOverruns).is_err());
        assert!(ds.make_unsafe(SafeModeCause::MakeSafeTc).is_ok());
        assert!(!ds.safe);
    }

    #[test]
    fn test_shot_snapshot_latched() {
        let (mut ds, model) = data_store();
        let mut params = SimParams::default();

        // 4 m from the target, facing away so vision can't see it
        params.initial_pose = crate::loc::Pose::new(3.0, -1.0, std::f64::consts::PI);
        let mut sim = SimPlant::new(params, &ds.field);

        ds.start_shot();
        run_cycle(&mut ds, &model, &mut sim);

        let shot = ds.shot.unwrap();
        assert_eq!(shot.source, SetpointSource::Odometry);
        assert_eq!(shot.setpoint, 3400.0);
        assert_eq!(ds.launcher_dems.setpoint, Some(3400.0));

        // Changing the override mid shot doesn't move the setpoint
        ds.operator.hard_coded_velocity = Some(2000.0);
        run_cycle(&mut ds, &model, &mut sim);
        assert_eq!(ds.shot.unwrap().setpoint, 3400.0);

        ds.stop_shot();
        assert!(ds.shot.is_none());
        assert!(!ds.cargo_flow.is_active());
    }

    #[test]
    fn test_outtake_around_a_shot() {
        let (mut ds, model) = data_store();
        let mut sim = SimPlant::new(SimParams::default(), &ds.field);
        let cargo = sim.cargo_remaining() as u64;

        // Outtake requested during a shot does nothing until the shot ends
        ds.operator.hard_coded_velocity = Some(3000.0);
        ds.operator.conveyor = ManualConveyor::Outtake;
        ds.start_shot();
        for _ in 0..50 {
            run_cycle(&mut ds, &model, &mut sim);
            assert!(ds.conveyor_dems.power >= 0.0);
        }
        assert_eq!(sim.num_ejected(), 0);

        ds.stop_shot();
        for _ in 0..(5.0 / DT) as usize {
            run_cycle(&mut ds, &model, &mut sim);
        }
        assert!(ds.conveyor_dems.power < 0.0);
        assert_eq!(sim.num_ejected() + sim.num_launched(), cargo);
        assert!(sim.num_ejected() > 0);

        // Safe mode drops the request and stops the conveyor
        ds.make_safe(SafeModeCause::MakeSafeTc);
        assert_eq!(ds.conveyor_dems.power, 0.0);
        assert_eq!(ds.operator.conveyor, ManualConveyor::Off);
    }

    #[test]
    fn test_closed_loop_shot() {
        let (mut ds, model) = data_store();
        let mut sim = SimPlant::new(SimParams::default(), &ds.field);

        ds.operator.hard_coded_velocity = Some(3000.0);
        ds.start_shot();

        for _ in 0..(10.0 / DT) as usize {
            run_cycle(&mut ds, &model, &mut sim);
        }

        assert_eq!(sim.num_launched(), 2);
        assert_eq!(ds.cargo_flow.cargo_released(), 2);
        assert_eq!(
            ds.drive_ctrl_status_rpt.map(|r| r.path), 
            Some(DrivePath::Terminate)
        );
    }
}
