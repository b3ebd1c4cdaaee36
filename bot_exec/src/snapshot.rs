//! # Cycle snapshot
//!
//! Everything the controllers read in one cycle, sampled once at the top of the cycle and
//! passed by value. No controller reads another's state directly, anything shared goes through
//! here.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        cargo::BeamSens,
        drive::DriveSens,
        launcher::{Hood, LauncherSens},
        vision::VisionSample,
    },
    tc::JoystickAxes,
};

use crate::{
    cargo_flow::{self, ManualConveyor},
    drive_ctrl,
    loc::{FieldParams, Pose},
    shooter_model::{SetpointInputs, ShotSnapshot},
    sim::SimSens,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Operator demands, held between telecommands.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OperatorState {
    pub axes: JoystickAxes,
    pub adjust_to_target: bool,
    pub hood: Hood,
    pub hard_coded_velocity: Option<f64>,

    /// Conveyor request held until changed, ignored while shooting.
    pub conveyor: ManualConveyor,
}

/// The inputs for one cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleInputs {
    /// Cycle timestamp.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub operator: OperatorState,

    pub pose: Pose,
    pub vision: VisionSample,
    pub drive_sens: DriveSens,
    pub beams: BeamSens,
    pub launcher: LauncherSens,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleInputs {
    pub fn new(time_s: f64, operator: OperatorState, sens: &SimSens) -> Self {
        Self {
            time_s,
            operator,
            pose: sens.pose,
            vision: sens.vision,
            drive_sens: sens.drive,
            beams: sens.beams,
            launcher: sens.launcher,
        }
    }

    pub fn drive_ctrl_input(&self) -> drive_ctrl::InputData {
        drive_ctrl::InputData {
            time_s: self.time_s,
            axes: self.operator.axes,
            adjust_to_target: self.operator.adjust_to_target,
            pose: self.pose,
            vision: self.vision,
            drive_sens: self.drive_sens,
        }
    }

    pub fn setpoint_inputs(&self, field: &FieldParams) -> SetpointInputs {
        SetpointInputs {
            hard_coded: self.operator.hard_coded_velocity,
            vision: self.vision,
            odometry_distance_m: self.pose.distance_to(&field.target_pos_m),
            hood: self.operator.hood,
        }
    }

    pub fn cargo_flow_input(&self, shot: Option<ShotSnapshot>) -> cargo_flow::InputData {
        cargo_flow::InputData {
            time_s: self.time_s,
            beams: self.beams,
            launcher: self.launcher,
            shot,
            manual: self.operator.conveyor,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_snapshot_routing() {
        let sens = SimSens {
            pose: Pose::new(3.0, 1.0, 0.5),
            beams: BeamSens { pre_gate: true, post_gate: false },
            launcher: LauncherSens { velocity: 1200.0 },
            ..SimSens::default()
        };
        let operator = OperatorState {
            axes: JoystickAxes { forward: 1.0, strafe: 0.0, rotation: 0.0 },
            adjust_to_target: true,
            hood: Hood::Open,
            hard_coded_velocity: None,
            conveyor: ManualConveyor::Outtake,
        };
        let inputs = CycleInputs::new(2.5, operator, &sens);

        let d = inputs.drive_ctrl_input();
        assert_eq!(d.time_s, 2.5);
        assert!(d.adjust_to_target);
        assert_eq!(d.pose, sens.pose);

        let s = inputs.setpoint_inputs(&FieldParams::default());
        assert_eq!(s.hood, Hood::Open);
        assert!((s.odometry_distance_m - 2.0).abs() < 1e-12);

        let c = inputs.cargo_flow_input(Some(ShotSnapshot::default()));
        assert!(c.beams.pre_gate);
        assert_eq!(c.manual, ManualConveyor::Outtake);
        assert_eq!(c.launcher.velocity, 1200.0);
    }
}
