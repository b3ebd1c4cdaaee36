//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the robot's equipment.
//! Demands flow out of the controllers, sensing data flows in at the top of each cycle.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod cargo;
pub mod drive;
pub mod launcher;
pub mod vision;
