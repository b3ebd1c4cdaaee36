//! Parameters structure for CargoFlow

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::CargoFlowError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Conveyor power used to move cargo toward the launcher.
    ///
    /// Units: between -1 and +1
    pub feed_power: f64,

    /// Time a ball is held at the pre-gate sensor before being pushed through.
    ///
    /// Units: seconds
    pub settle_period_s: f64,

    /// Maximum difference between the launcher setpoint and measured velocity for the launcher
    /// to be considered at speed.
    ///
    /// Units: launcher velocity units
    pub velocity_deadband: f64,

    /// Conveyor power magnitude used to back cargo out of the intake, applied in reverse.
    ///
    /// Units: between 0 and +1
    pub outtake_power: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn validate(&self) -> Result<(), CargoFlowError> {
        if !(self.feed_power.is_finite() && self.feed_power.abs() <= 1.0) {
            return Err(CargoFlowError::InvalidParams(format!(
                "feed_power must be between -1 and 1, found {}", self.feed_power
            )));
        }

        if !(self.settle_period_s.is_finite() && self.settle_period_s >= 0.0) {
            return Err(CargoFlowError::InvalidParams(format!(
                "settle_period_s must not be negative, found {}", self.settle_period_s
            )));
        }

        if !(self.velocity_deadband.is_finite() && self.velocity_deadband > 0.0) {
            return Err(CargoFlowError::InvalidParams(format!(
                "velocity_deadband must be positive, found {}", self.velocity_deadband
            )));
        }

        if !(self.outtake_power.is_finite() && self.outtake_power > 0.0 
            && self.outtake_power <= 1.0) 
        {
            return Err(CargoFlowError::InvalidParams(format!(
                "outtake_power must be in (0, 1], found {}", self.outtake_power
            )));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            feed_power: 0.6,
            settle_period_s: 0.3,
            velocity_deadband: 50.0,
            outtake_power: 0.5,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Params::default().validate().is_ok());

        let mut p = Params::default();
        p.outtake_power = -0.5;
        assert!(matches!(p.validate(), Err(CargoFlowError::InvalidParams(_))));

        let mut p = Params::default();
        p.velocity_deadband = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_load_from_toml() {
        let p: Params = util::params::load_str(
            "feed_power = 0.6\nsettle_period_s = 0.3\nvelocity_deadband = 50.0\nouttake_power = 0.5"
        ).unwrap();
        assert_eq!(p.outtake_power, 0.5);
        assert!(p.validate().is_ok());
    }
}
