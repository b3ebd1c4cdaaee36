//! # Robot Executable Parameters
//!
//! This module provide parameters for the robot executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use util::logger::LogConfig;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BotExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycle overruns after which the robot is made safe.
    pub max_consec_overruns: u64,

    /// Directory, relative to the software root, sessions are created in.
    pub sessions_dir: String,

    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for BotExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            max_consec_overruns: 50,
            sessions_dir: String::from("sessions"),
            log: LogConfig::default(),
        }
    }
}
