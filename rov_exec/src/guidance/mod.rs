//! # Guidance module
//!
//! Guidance is the outer loop of the rover. It steers the rover along a list of GPS waypoints by
//! comparing the great-circle bearing to the current target waypoint with the rover's heading.
//! A single heading PID converts the heading error into a differential speed command, with the
//! cross track error added to the heading error as a bias which pulls the rover back onto the
//! direct line to the target.
//!
//! The mission itself is a small state machine:
//!
//! ```text
//! Idle --upload--> Planned --start--> Active <--pause/resume--> Paused
//!                                       |
//!                                       +--last waypoint--> Completed
//! any --abort/timeout--> Aborted
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod geo;
pub mod mission;
pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use controllers::HeadingPid;
pub use geo::LatLon;
pub use mission::{Mission, PathSegment};
pub use params::Params;
pub use state::*;

use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// State of the mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissionState {
    Idle,
    Planned,
    Active,
    Paused,
    Completed,
    Aborted,
}

/// Errors which can occur in guidance.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum GuidanceError {
    #[error("Cannot load a new mission while the current one is {0:?}")]
    MissionInProgress(MissionState),

    #[error("Cannot {event} a mission which is {from:?}")]
    InvalidTransition {
        from: MissionState,
        event: &'static str,
    },

    #[error("A mission must contain at least one waypoint")]
    EmptyMission,

    #[error("A mission of {0} waypoints is longer than the maximum of {1}")]
    TooManyWaypoints(usize, usize),

    #[error("Invalid guidance parameters: {0}")]
    InvalidParams(&'static str),
}

impl Default for MissionState {
    fn default() -> Self {
        MissionState::Idle
    }
}
