//! # Manual drive telecommands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::TcError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction of a manual drive command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FromStr for DriveDirection {
    type Err = TcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(DriveDirection::Forward),
            "backward" => Ok(DriveDirection::Backward),
            "left" => Ok(DriveDirection::Left),
            "right" => Ok(DriveDirection::Right),
            "stop" => Ok(DriveDirection::Stop),
            _ => Err(TcError::InvalidDirection(s.to_string())),
        }
    }
}
