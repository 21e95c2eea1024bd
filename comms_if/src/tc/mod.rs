//! # Telecommand module
//!
//! This module provides the telecommands accepted by the rover core. Each command is validated
//! once at intake, and only commands which pass validation are handed to the rover, so the rest of
//! the core never has to deal with malformed input.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod manual;
pub mod mission;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use manual::DriveDirection;
pub use mission::{MissionParams, WaypointSpec};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum manual drive speed in percent.
pub const MAX_SPEED_PCT: u8 = 100;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the rover by a ground station or operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tc {
    /// Replace the current mission with a new set of waypoints.
    UploadMission {
        mission_id: String,
        waypoints: Vec<WaypointSpec>,
        #[serde(default)]
        params: MissionParams,
    },

    /// Start the uploaded mission.
    Start,

    /// Pause the active mission.
    Pause,

    /// Resume a paused mission.
    Resume,

    /// Abort the mission.
    Abort,

    /// Drive in the given direction at the given speed. Only acted on in manual mode.
    ManualDrive {
        direction: DriveDirection,
        speed_pct: u8,
    },

    /// Enter or leave manual mode.
    ManualMode { enabled: bool },
}

/// Reasons for which a telecommand is rejected at intake.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TcError {
    #[error("Unknown drive direction \"{0}\"")]
    InvalidDirection(String),

    #[error("Speed of {0} % is out of range (0 to 100 %)")]
    SpeedOutOfRange(u8),

    #[error("A mission must contain at least one waypoint")]
    EmptyMission,

    #[error("A mission of {0} waypoints is longer than the maximum of {1}")]
    TooManyWaypoints(usize, usize),

    #[error("Waypoint {index} is malformed: {reason}")]
    InvalidWaypoint { index: usize, reason: &'static str },

    #[error("Mission parameters are invalid: {0}")]
    InvalidParams(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Build a manual drive command from a direction string and a speed, validating both.
    pub fn manual_drive(direction: &str, speed_pct: u8) -> Result<Self, TcError> {
        let tc = Tc::ManualDrive {
            direction: direction.parse()?,
            speed_pct,
        };
        tc.validate(0)?;
        Ok(tc)
    }

    /// Check the command is well formed.
    ///
    /// `max_waypoints` is the capacity of the rover's mission store and is only used for mission
    /// uploads.
    pub fn validate(&self, max_waypoints: usize) -> Result<(), TcError> {
        match self {
            Tc::UploadMission {
                waypoints, params, ..
            } => {
                if waypoints.is_empty() {
                    return Err(TcError::EmptyMission);
                }
                if waypoints.len() > max_waypoints {
                    return Err(TcError::TooManyWaypoints(waypoints.len(), max_waypoints));
                }
                for (index, wp) in waypoints.iter().enumerate() {
                    wp.check()
                        .map_err(|reason| TcError::InvalidWaypoint { index, reason })?;
                }
                params.check().map_err(TcError::InvalidParams)
            }
            Tc::ManualDrive { speed_pct, .. } => {
                if *speed_pct > MAX_SPEED_PCT {
                    Err(TcError::SpeedOutOfRange(*speed_pct))
                } else {
                    Ok(())
                }
            }
            Tc::Start | Tc::Pause | Tc::Resume | Tc::Abort | Tc::ManualMode { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mission(waypoints: Vec<WaypointSpec>) -> Tc {
        Tc::UploadMission {
            mission_id: "m1".into(),
            waypoints,
            params: MissionParams::default(),
        }
    }

    #[test]
    fn test_manual_drive_validation() {
        assert_eq!(
            Tc::manual_drive("forward", 50),
            Ok(Tc::ManualDrive {
                direction: DriveDirection::Forward,
                speed_pct: 50
            })
        );
        assert_eq!(
            Tc::manual_drive("sideways", 50),
            Err(TcError::InvalidDirection("sideways".into()))
        );
        assert_eq!(
            Tc::manual_drive("left", 101),
            Err(TcError::SpeedOutOfRange(101))
        );
    }

    #[test]
    fn test_mission_validation() {
        let wp = WaypointSpec::new(51.0, -1.0);

        assert_eq!(mission(vec![]).validate(10), Err(TcError::EmptyMission));
        assert_eq!(
            mission(vec![wp; 11]).validate(10),
            Err(TcError::TooManyWaypoints(11, 10))
        );
        assert!(mission(vec![wp; 10]).validate(10).is_ok());

        let bad = mission(vec![wp, WaypointSpec::new(91.0, 0.0)]);
        assert!(matches!(
            bad.validate(10),
            Err(TcError::InvalidWaypoint { index: 1, .. })
        ));

        let nan = mission(vec![WaypointSpec::new(0.0, f64::NAN)]);
        assert!(matches!(
            nan.validate(10),
            Err(TcError::InvalidWaypoint { index: 0, .. })
        ));
    }

    #[test]
    fn test_deserialise() {
        let tc: Tc = toml::from_str(
            r#"
            type = "upload_mission"
            mission_id = "field_test"

            [[waypoints]]
            lat_deg = 51.5
            lon_deg = -0.1

            [params]
            speed_mps = 0.5
            "#,
        )
        .unwrap();

        match tc {
            Tc::UploadMission {
                mission_id,
                waypoints,
                params,
            } => {
                assert_eq!(mission_id, "field_test");
                assert_eq!(waypoints.len(), 1);
                assert_eq!(params.speed_mps, 0.5);
                assert_eq!(params.mission_timeout_s, 3600);
            }
            _ => panic!("Expected a mission upload"),
        }
    }
}
