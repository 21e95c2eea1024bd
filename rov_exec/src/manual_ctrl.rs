//! # Manual control
//!
//! Maps manual drive commands onto differential speed commands.

use comms_if::tc::{DriveDirection, MAX_SPEED_PCT};
use util::maths::lin_map;

use crate::drive_ctrl::MAX_CMD;

/// Differential speeds for a manual command, or `None` if the command is a stop.
pub fn speeds(direction: DriveDirection, speed_pct: u8) -> Option<(i16, i16)> {
    let s = lin_map(
        (0.0, MAX_SPEED_PCT as f64),
        (0.0, MAX_CMD as f64),
        speed_pct.min(MAX_SPEED_PCT) as f64,
    )
    .round() as i16;

    match direction {
        DriveDirection::Forward => Some((s, s)),
        DriveDirection::Backward => Some((-s, -s)),
        DriveDirection::Left => Some((-s, s)),
        DriveDirection::Right => Some((s, -s)),
        DriveDirection::Stop => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_speeds() {
        assert_eq!(speeds(DriveDirection::Forward, 100), Some((255, 255)));
        assert_eq!(speeds(DriveDirection::Forward, 50), Some((128, 128)));
        assert_eq!(speeds(DriveDirection::Backward, 20), Some((-51, -51)));
        assert_eq!(speeds(DriveDirection::Left, 100), Some((-255, 255)));
        assert_eq!(speeds(DriveDirection::Right, 100), Some((255, -255)));
        assert_eq!(speeds(DriveDirection::Stop, 100), None);
    }
}
