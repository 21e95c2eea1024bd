//! Parameters structure for guidance

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use util::time::Millis;

use super::GuidanceError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Guidance parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- HEADING CONTROLLER ----
    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Maximum magnitude of the heading controller's accumulated error.
    ///
    /// Units: degrees
    pub head_integral_limit: f64,

    /// Gain applied to the cross track error before it is added to the heading error.
    ///
    /// Units: degrees/meter
    pub k_xte: f64,

    // ---- SPEED ----
    /// Speed command of both sides when the rover is on heading.
    pub base_speed: i16,

    /// Largest speed command guidance will send to a side.
    pub max_cmd: i16,

    // ---- WAYPOINTS ----
    /// Distance at which a waypoint counts as reached.
    ///
    /// Units: meters
    pub waypoint_threshold_m: f64,

    /// Largest number of waypoints in a mission.
    pub max_waypoints: usize,

    // ---- SENSORS ----
    /// Oldest position fix guidance will act on.
    ///
    /// Units: milliseconds
    pub max_position_age_ms: Millis,

    /// Oldest orientation sample guidance will act on.
    ///
    /// Units: milliseconds
    pub max_orientation_age_ms: Millis,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn are_valid(&self) -> Result<(), GuidanceError> {
        if self.head_k_p < 0.0 || self.head_k_i < 0.0 || self.head_k_d < 0.0 {
            return Err(GuidanceError::InvalidParams("heading gains must not be negative"));
        }
        if !(self.head_integral_limit >= 0.0) {
            return Err(GuidanceError::InvalidParams("integral limit must not be negative"));
        }
        if self.max_cmd <= 0 || self.max_cmd > crate::drive_ctrl::MAX_CMD {
            return Err(GuidanceError::InvalidParams("max_cmd outside the drive command range"));
        }
        if self.base_speed < 0 || self.base_speed > self.max_cmd {
            return Err(GuidanceError::InvalidParams("base_speed must be in [0, max_cmd]"));
        }
        if !(self.waypoint_threshold_m > 0.0) {
            return Err(GuidanceError::InvalidParams("waypoint threshold must be positive"));
        }
        if self.max_waypoints == 0 {
            return Err(GuidanceError::InvalidParams("max_waypoints must be non-zero"));
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            head_k_p: 0.5,
            head_k_i: 0.1,
            head_k_d: 0.05,
            head_integral_limit: 100.0,
            k_xte: 10.0,
            base_speed: 100,
            max_cmd: 255,
            waypoint_threshold_m: 2.0,
            max_waypoints: 10,
            max_position_age_ms: 2500,
            max_orientation_age_ms: 500,
        }
    }
}
