//! # Mission telecommands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A waypoint as supplied by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointSpec {
    /// Latitude in degrees, positive north.
    pub lat_deg: f64,

    /// Longitude in degrees, positive east.
    pub lon_deg: f64,
}

/// Per-mission parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionParams {
    /// Nominal ground speed, used for segment speeds and time estimates.
    pub speed_mps: f64,

    /// Cross track error above which the rover reports it is off the track.
    pub cte_threshold_m: f64,

    /// Maximum active time before the mission is aborted.
    pub mission_timeout_s: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WaypointSpec {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    pub(crate) fn check(&self) -> Result<(), &'static str> {
        if !self.lat_deg.is_finite() || !self.lon_deg.is_finite() {
            return Err("coordinates must be finite");
        }
        if self.lat_deg.abs() > 90.0 {
            return Err("latitude outside [-90, 90] degrees");
        }
        if self.lon_deg.abs() > 180.0 {
            return Err("longitude outside [-180, 180] degrees");
        }
        Ok(())
    }
}

impl MissionParams {
    pub(crate) fn check(&self) -> Result<(), &'static str> {
        if !(self.speed_mps.is_finite() && self.speed_mps > 0.0) {
            return Err("speed must be positive");
        }
        if !(self.cte_threshold_m.is_finite() && self.cte_threshold_m >= 0.0) {
            return Err("cross track threshold must not be negative");
        }
        if self.mission_timeout_s == 0 {
            return Err("timeout must be non-zero");
        }
        Ok(())
    }
}

impl Default for MissionParams {
    fn default() -> Self {
        Self {
            speed_mps: 1.0,
            cte_threshold_m: 2.0,
            mission_timeout_s: 3600,
        }
    }
}
