//! # Rover library.
//!
//! The rover control core: everything between the sensor sources and the motor driver. The
//! `rov_exec` binary composes these modules, the integration tests and benchmarks drive them
//! directly.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - the records shared between the periodic activities
pub mod data_store;

/// Drive control - encoders, per-wheel velocity loops and the stop-lock
pub mod drive_ctrl;

/// Guidance - mission state machine and waypoint following
pub mod guidance;

/// Manual control - maps direction and speed commands onto wheel speeds
pub mod manual_ctrl;

/// Rover - owns the store and the controllers, one method per activity
pub mod rover;

/// Safety monitor - obstacle stop and manual command timeout
pub mod safety;

/// Scheduler - runs each activity on its own periodic thread
pub mod sched;

/// Simulation plant - stands in for the motors and sensors
pub mod sim;

/// Telecommand processor
pub mod tc_processor;

/// Telemetry packet
pub mod tm;

pub use rover::{Rover, RoverError, RoverParams};
