//! # Data Store
//!
//! Shared state of the rover. Every record sits behind its own lock and is only ever copied in or
//! out, so independent activities never serialise on unrelated data and nothing holds a
//! reference into the store across another blocking call.
//!
//! Record accessors wait a bounded time for the lock and return `StoreError::Unavailable` on
//! timeout. Callers treat that exactly like invalid data for the current cycle. The mission
//! record is the exception, it is touched rarely and never from the drive loop, so it waits
//! indefinitely.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::DriveDirection;
use serde::Serialize;
use std::sync::Arc;

use util::{
    guarded::{Guarded, StoreError},
    maths::compass_deg,
    time::Millis,
};

use crate::{
    drive_ctrl::{self, NUM_SIDES},
    guidance::{GuidanceStatus, Mission, MissionState},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GpsPosition {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub valid: bool,
    pub timestamp_ms: Millis,
}

/// An orientation sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Orientation {
    /// Heading clockwise from north, [0, 360).
    pub heading_deg: f64,
    pub valid: bool,
    pub timestamp_ms: Millis,
}

/// The latest obstacle range measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ObstacleRange {
    /// Distance to the nearest obstacle. Zero or negative means no reading.
    pub distance_cm: f64,
    pub timestamp_ms: Millis,
}

/// Manual drive state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ManualCmd {
    /// Manual mode is on, guidance output is ignored.
    pub enabled: bool,

    pub direction: DriveDirection,
    pub speed_pct: u8,

    /// When the last drive command arrived, `None` if none has since the last timeout.
    pub received_ms: Option<Millis>,
}

/// Aggregate status of the rover, pulled by telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RoverState {
    // ---- GUIDANCE ----
    pub mission_state: MissionState,
    pub navigating: bool,
    pub wp_index: usize,
    pub num_waypoints: usize,
    pub progress_pct: f64,
    pub cross_track_m: f64,
    pub distance_to_target_m: f64,
    pub heading_error_deg: f64,
    pub eta_s: f64,
    pub elapsed_active_s: f64,
    pub xte_limit_exceeded: bool,

    // ---- DRIVE ----
    pub armed: bool,
    pub stop_lock: bool,
    pub speed_cmd: [i16; NUM_SIDES],
    pub motor_pwm: [i16; NUM_SIDES],
    pub motor_rpm: [f64; NUM_SIDES],
    pub encoder_counts: [i32; NUM_SIDES],
    pub wheel_stalled: [bool; NUM_SIDES],

    // ---- SAFETY ----
    pub obstacle_distance_cm: f64,
    pub obstacle_stop: bool,
    pub manual_mode: bool,
    pub manual_timed_out: bool,
}

/// Shared state of the rover.
#[derive(Debug)]
pub struct DataStore {
    pub position: Guarded<GpsPosition>,
    pub orientation: Guarded<Orientation>,
    pub obstacle: Guarded<ObstacleRange>,
    pub mission: Guarded<Option<Arc<Mission>>>,
    pub rover_state: Guarded<RoverState>,
    pub manual: Guarded<ManualCmd>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ManualCmd {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: DriveDirection::Stop,
            speed_pct: 0,
            received_ms: None,
        }
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self {
            position: Guarded::new("position", GpsPosition::default()),
            orientation: Guarded::new("orientation", Orientation::default()),
            obstacle: Guarded::new("obstacle", ObstacleRange::default()),
            mission: Guarded::unbounded("mission", None),
            rover_state: Guarded::new("rover_state", RoverState::default()),
            manual: Guarded::new("manual", ManualCmd::default()),
        }
    }
}

impl DataStore {
    /// Position source input.
    pub fn publish_position(
        &self,
        lat_deg: f64,
        lon_deg: f64,
        valid: bool,
        timestamp_ms: Millis,
    ) -> Result<(), StoreError> {
        self.position.set(GpsPosition {
            lat_deg,
            lon_deg,
            valid: valid && lat_deg.is_finite() && lon_deg.is_finite(),
            timestamp_ms,
        })
    }

    /// Orientation source input.
    pub fn publish_orientation(
        &self,
        heading_deg: f64,
        valid: bool,
        timestamp_ms: Millis,
    ) -> Result<(), StoreError> {
        let valid = valid && heading_deg.is_finite();
        self.orientation.set(Orientation {
            heading_deg: if valid { compass_deg(heading_deg) } else { 0.0 },
            valid,
            timestamp_ms,
        })
    }

    /// Obstacle range source input.
    pub fn publish_obstacle_distance(
        &self,
        distance_cm: f64,
        timestamp_ms: Millis,
    ) -> Result<(), StoreError> {
        self.obstacle.set(ObstacleRange {
            distance_cm,
            timestamp_ms,
        })?;
        self.rover_state
            .modify(|rs| rs.obstacle_distance_cm = distance_cm)
    }

    /// Copy the guidance telemetry into the rover state.
    pub fn record_guidance(&self, status: &GuidanceStatus) -> Result<(), StoreError> {
        self.rover_state.modify(|rs| {
            rs.mission_state = status.state;
            rs.navigating = status.navigating;
            rs.wp_index = status.wp_index;
            rs.num_waypoints = status.num_waypoints;
            rs.progress_pct = status.progress_pct;
            rs.cross_track_m = status.cross_track_m;
            rs.distance_to_target_m = status.distance_to_target_m;
            rs.heading_error_deg = status.heading_error_deg;
            rs.eta_s = status.eta_s;
            rs.elapsed_active_s = status.elapsed_active_s;
            rs.xte_limit_exceeded = status.xte_limit_exceeded;
        })
    }

    /// Copy the drive control report into the rover state.
    pub fn record_drive(&self, report: &drive_ctrl::StatusReport) -> Result<(), StoreError> {
        self.rover_state.modify(|rs| {
            rs.armed = report.armed;
            rs.stop_lock = report.stop_lock;
            rs.speed_cmd = report.cmd;
            rs.encoder_counts = report.encoder_counts;
            for i in 0..NUM_SIDES {
                rs.motor_pwm[i] = report.wheels[i].output;
                rs.motor_rpm[i] = report.wheels[i].rpm;
                rs.wheel_stalled[i] = report.wheels[i].stalled;
            }
        })
    }
}
