//! # Telecommand module
//!
//! This module provides the operator commands accepted by the robot. Commands are JSON objects
//! of the form `{"type": "<TYPE>", "payload": <payload>}`, where commands without data omit the
//! payload.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// Internal
use crate::eqpt::launcher::Hood;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Driver stick demands, already mapped and scaled by the caller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoystickAxes {
    /// Forward demand.
    ///
    /// Units: meters/second
    pub forward: f64,

    /// Strafe (left) demand.
    ///
    /// Units: meters/second
    pub strafe: f64,

    /// Rotation (left) demand.
    ///
    /// Units: radians/second
    pub rotation: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot by the operator or a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Tc {
    /// Stop everything and reject all commands except `MakeUnsafe`.
    #[serde(rename = "SAFE")]
    MakeSafe,

    /// Leave safe mode.
    #[serde(rename = "UNSAFE")]
    MakeUnsafe,

    /// New driver stick demands, held until the next `SetAxes`.
    #[serde(rename = "AXES")]
    SetAxes(JoystickAxes),

    /// Enable or disable adjusting the heading toward the target.
    #[serde(rename = "ADJUST")]
    SetAdjust(bool),

    /// Move the launcher hood.
    #[serde(rename = "HOOD")]
    SetHood(Hood),

    /// Spin up the launcher and start feeding cargo once it's at speed.
    #[serde(rename = "SHOOT")]
    StartShot,

    /// Stop feeding cargo and let the launcher coast.
    #[serde(rename = "STOP_SHOOT")]
    StopShot,

    /// Override the launcher setpoint with a fixed velocity, or clear the override with `null`.
    #[serde(rename = "VELOCITY")]
    HardCodedVelocity(Option<f64>),

    /// Run the conveyor at a fixed power outside of a shot, negative runs it backwards. `null`
    /// or zero stops it.
    #[serde(rename = "CONVEY")]
    Convey(Option<f64>),

    /// Start (`true`) or stop (`false`) backing cargo out through the intake.
    #[serde(rename = "OUTTAKE")]
    Outtake(bool),

    /// Turn the chassis on the spot to a field heading.
    #[serde(rename = "TURN")]
    TurnToAngle {
        /// Target heading.
        ///
        /// Units: degrees
        target_deg: f64,
    },
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)?;

        // Check the type before handing over to serde so the error says which part is wrong
        let tc_type = match val["type"].as_str() {
            Some(s) => s.to_string(),
            None => {
                return Err(TcParseError::InvalidType(String::from(
                    "Expected \"type\" to be a string",
                )))
            }
        };

        serde_json::from_value(val).map_err(|e| TcParseError::InvalidPayload(tc_type, e))
    }

    /// Serialise the TC into a JSON packet.
    pub fn to_json(&self) -> String {
        // Serialising an enum of plain data into a string cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
