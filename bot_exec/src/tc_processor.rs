//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use comms_if::tc::{JoystickAxes, Tc};
use crate::{
    cargo_flow::ManualConveyor,
    data_store::{DataStore, SafeModeCause},
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Handle a telecommand, respecting safe mode.
///
/// In safe mode only `MakeUnsafe` is executed. Returns true if the TC was executed.
pub fn handle(ds: &mut DataStore, tc: &Tc) -> bool {
    match (ds.safe, tc) {
        (false, _) | (true, Tc::MakeUnsafe) => {
            exec(ds, tc);
            true
        },
        (true, _) => {
            warn!("Rejected {:?} while in safe mode", tc);
            false
        }
    }
}

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules.
pub fn exec(ds: &mut DataStore, tc: &Tc) {

    // Handle different Tcs
    match tc {
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        },
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            ds.make_unsafe(SafeModeCause::MakeSafeTc).ok();
        },
        Tc::SetAxes(axes) => {
            // The driver taking the sticks cancels any automatic turn
            if *axes != JoystickAxes::default() {
                ds.drive_ctrl.abort_turn_to_angle();
            }
            ds.operator.axes = *axes;
        },
        Tc::SetAdjust(adjust) => {
            debug!("Adjust to target {}", adjust);
            ds.operator.adjust_to_target = *adjust;
        },
        Tc::SetHood(hood) => {
            debug!("Hood {:?}", hood);
            ds.operator.hood = *hood;
        },
        Tc::StartShot => ds.start_shot(),
        Tc::StopShot => ds.stop_shot(),
        Tc::HardCodedVelocity(v) => {
            debug!("Hard coded launcher velocity {:?}", v);
            ds.operator.hard_coded_velocity = *v;
        },
        Tc::Convey(power) => {
            ds.operator.conveyor = match power {
                Some(p) if *p != 0.0 => ManualConveyor::Convey { power: *p },
                _ => ManualConveyor::Off,
            };
            log_held_while_shooting(ds);
        },
        Tc::Outtake(on) => {
            ds.operator.conveyor = match on {
                true => ManualConveyor::Outtake,
                false => ManualConveyor::Off,
            };
            log_held_while_shooting(ds);
        },
        Tc::TurnToAngle { target_deg } => {
            ds.drive_ctrl.begin_turn_to_angle(target_deg.to_radians());
        }
    }

}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn log_held_while_shooting(ds: &DataStore) {
    match ds.shot.is_some() || ds.shot_requested {
        true => debug!("Conveyor request {:?} held until the shot ends", ds.operator.conveyor),
        false => debug!("Conveyor request {:?}", ds.operator.conveyor),
    }
}
