//! Main robot-side executable entry point.
//! 
//! # Architecture
//! 
//! The general execution methodology consists of:
//! 
//!     - Initialise all modules
//!     - Main loop:
//!         - Equipment sensing (from the plant simulation)
//!         - Telecommand processing and handling
//!         - Drive control processing
//!         - Shooter setpoint resolution
//!         - Cargo flow processing
//!         - Equipment actuation
//!         - Archiving
//! 
//! # Modules
//! 
//! All modules (e.g. `drive_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!     2. Implement `util::module::Terminate` if they own an actuator.
//!     3. Implement `util::archive::Archived`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use bot_lib::{
    cargo_flow,
    data_store::{DataStore, SafeModeCause},
    drive_ctrl,
    loc::{FieldParams, Pose},
    params::BotExecParams,
    shooter_model::{self, ShooterModel},
    sim::{SimParams, SimPlant},
    snapshot::CycleInputs,
    tc_processor,
};
use util::{
    archive::Archived,
    logger::logger_init,
    module::State,
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "bot_exec", about = "Robot drive and cargo flow executable")]
struct Opts {
    /// Telecommand script to run, execution stops at the end of the script
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Stop after this many cycles
    #[structopt(short, long)]
    cycles: Option<u64>,
}

/// Summary of the run, saved into the session on exit.
#[derive(Debug, Serialize)]
struct RunSummary {
    num_cycles: u64,
    sim_time_s: f64,
    final_pose: Pose,
    cargo_released: u64,
    cargo_launched: u64,
    cargo_ejected: u64,
    safe: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Exec params are needed before the logger is up, so load them first
    let exec_params: BotExecParams = util::params::load("exec.toml")
        .wrap_err("Could not load exec params")?;

    // Initialise session
    let session = Session::new("bot_exec", &exec_params.sessions_dir)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(&exec_params.log, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let drive_ctrl_params: drive_ctrl::Params = util::params::load("drive_ctrl.toml")
        .wrap_err("Could not load drive control params")?;
    let field: FieldParams = util::params::load("field.toml")
        .wrap_err("Could not load field params")?;
    let shooter_params: shooter_model::Params = util::params::load("shooter_model.toml")
        .wrap_err("Could not load shooter model params")?;
    let cargo_flow_params: cargo_flow::Params = util::params::load("cargo_flow.toml")
        .wrap_err("Could not load cargo flow params")?;
    let sim_params: SimParams = util::params::load("sim.toml")
        .wrap_err("Could not load sim params")?;

    info!("Parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    let mut script = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            Some(si)
        },
        None => {
            info!("No script provided, the robot will sit idle\n");
            None
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();
    ds.field = field;

    // ---- INITIALISE MODULES ----

    ds.drive_ctrl.init(
        drive_ctrl::InitData { params: drive_ctrl_params, field }, 
        Some(&session)
    ).wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    let shooter_model = ShooterModel::new(&shooter_params)
        .wrap_err("Failed to initialise the shooter model")?;
    info!("ShooterModel init complete");

    ds.cargo_flow.init(cargo_flow_params, Some(&session))
        .wrap_err("Failed to initialise CargoFlow")?;
    info!("CargoFlow init complete");

    let mut sim = SimPlant::new(sim_params, &field)
        .with_archive(&session)
        .wrap_err("Failed to initialise the plant simulation")?;
    info!("SimPlant init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    info!("Begining main loop\n");

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_period_s);

        if let Some(max) = opts.cycles {
            if ds.num_cycles >= max {
                info!("Cycle limit ({}) reached, stopping", max);
                break;
            }
        }

        // ---- DATA INPUT ----

        let sens = sim.sense();

        // ---- TELECOMMAND PROCESSING ----

        if let Some(ref mut si) = script {
            match si.get_pending_tcs(ds.sim_time_s) {
                PendingTcs::None => (),
                PendingTcs::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::handle(&mut ds, tc);
                    }
                },
                // Exit if end of script reached
                PendingTcs::EndOfScript => {
                    info!("End of TC script reached, stopping");
                    break
                }
            }
        }

        ds.inputs = CycleInputs::new(ds.sim_time_s, ds.operator, &sens);

        // ---- CONTROL ALGORITHM PROCESSING ----

        ds.proc_controllers(&shooter_model);

        // ---- DATA OUTPUT ----

        sim.actuate(
            exec_params.cycle_period_s, 
            &ds.drive_dems, 
            &ds.conveyor_dems, 
            &ds.launcher_dems
        );

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.drive_ctrl.write() {
            warn!("Could not write DriveCtrl archives: {}", e);
        }
        if let Err(e) = ds.cargo_flow.write() {
            warn!("Could not write CargoFlow archives: {}", e);
        }
        if let Err(e) = sim.write() {
            warn!("Could not write SimPlant archives: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s", 
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns > exec_params.max_consec_overruns {
                    ds.make_safe(SafeModeCause::CycleOverruns);
                }
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    ds.stop_shot();

    let summary = RunSummary {
        num_cycles: ds.num_cycles,
        sim_time_s: ds.sim_time_s,
        final_pose: sim.pose(),
        cargo_released: ds.cargo_flow.cargo_released(),
        cargo_launched: sim.num_launched(),
        cargo_ejected: sim.num_ejected(),
        safe: ds.safe,
    };
    info!("Run summary: {:?}", summary);
    session.save("summary.json", summary);

    info!("End of execution");
    session.exit();

    Ok(())
}
