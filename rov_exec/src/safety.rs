//! # Safety monitor
//!
//! Checks run every drive loop tick which may force the drive to stop, pre-empting whatever
//! guidance or manual control last commanded:
//!
//! - An obstacle closer than the threshold stops the rover on every tick it is present.
//! - A manual drive command which is not refreshed within the timeout stops the rover once.
//!
//! The monitor never changes the mission state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;
use util::time::{elapsed_ms, Millis};

use crate::data_store::{ManualCmd, ObstacleRange};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Safety parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Obstacles closer than this stop the rover.
    ///
    /// Units: centimeters
    pub obstacle_threshold_cm: f64,

    /// Longest gap between manual drive commands before the rover is stopped.
    ///
    /// Units: milliseconds
    pub manual_timeout_ms: Millis,
}

pub struct SafetyMonitor {
    params: Params,
    obstacle_stop: bool,
}

/// What the monitor found on a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyActions {
    /// The drive must be stopped this tick.
    pub stop: bool,

    /// An obstacle is inside the threshold.
    pub obstacle_stop: bool,

    /// The manual command has expired and must be cleared.
    pub manual_timeout: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SafetyError {
    #[error("Invalid safety parameters: {0}")]
    InvalidParams(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    pub fn are_valid(&self) -> Result<(), SafetyError> {
        if !(self.obstacle_threshold_cm > 0.0) {
            return Err(SafetyError::InvalidParams(
                "obstacle_threshold_cm must be positive",
            ));
        }
        if self.manual_timeout_ms == 0 {
            return Err(SafetyError::InvalidParams("manual_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            obstacle_threshold_cm: 5.0,
            manual_timeout_ms: 150,
        }
    }
}

impl SafetyMonitor {
    pub fn new(params: Params) -> Result<Self, SafetyError> {
        params.are_valid()?;

        Ok(Self {
            params,
            obstacle_stop: false,
        })
    }

    /// True if the range reading is an obstacle inside the stop threshold.
    ///
    /// Non-positive readings are the sensor reporting nothing in range.
    pub fn is_obstacle(&self, range: &ObstacleRange) -> bool {
        range.distance_cm > 0.0 && range.distance_cm < self.params.obstacle_threshold_cm
    }

    /// Run the checks.
    ///
    /// A record which could not be read keeps the previous obstacle decision and skips the manual
    /// timeout check for this tick.
    pub fn check(
        &mut self,
        now_ms: Millis,
        obstacle: Option<ObstacleRange>,
        manual: Option<ManualCmd>,
    ) -> SafetyActions {
        let mut actions = SafetyActions::default();

        if let Some(range) = obstacle {
            let present = self.is_obstacle(&range);
            if present && !self.obstacle_stop {
                warn!(
                    "Obstacle at {:.1} cm (threshold {:.1} cm), stopping",
                    range.distance_cm, self.params.obstacle_threshold_cm
                );
            } else if !present && self.obstacle_stop {
                info!("Obstacle cleared ({:.1} cm)", range.distance_cm);
            }
            self.obstacle_stop = present;
        }

        actions.obstacle_stop = self.obstacle_stop;
        actions.stop = self.obstacle_stop;

        if let Some(ManualCmd {
            enabled: true,
            received_ms: Some(t),
            ..
        }) = manual
        {
            let age = elapsed_ms(now_ms, t);
            if age > self.params.manual_timeout_ms {
                warn!("No manual command for {} ms, stopping", age);
                actions.manual_timeout = true;
                actions.stop = true;
            }
        }

        actions
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}
