//! # Telecommand processor module
//!
//! The telecommand processor applies telecommands to the rover. Commands are validated before
//! anything is touched, so a rejected command leaves the rover unchanged.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use std::sync::Arc;
use thiserror::Error;

// Internal
use crate::{
    drive_ctrl::MotorOutput,
    guidance::{GuidanceError, Mission},
    manual_ctrl,
    rover::Rover,
};
use comms_if::tc::{DriveDirection, Tc, TcError};
use util::guarded::StoreError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a telecommand was not executed.
#[derive(Debug, Error)]
pub enum TcExecError {
    #[error("Invalid telecommand: {0}")]
    Invalid(#[from] TcError),

    #[error("Rejected by guidance: {0}")]
    Guidance(#[from] GuidanceError),

    #[error("Manual drive commands are only accepted in manual mode")]
    NotInManualMode,

    #[error("{0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
pub(crate) fn exec<M: MotorOutput>(rover: &Rover<M>, tc: &Tc) -> Result<(), TcExecError> {
    tc.validate(rover.guidance.lock().params().max_waypoints)?;

    let now_ms = rover.now_ms();

    match tc {
        Tc::UploadMission {
            mission_id,
            waypoints,
            params,
        } => {
            debug!("Recieved UploadMission command");
            let max = rover.guidance.lock().params().max_waypoints;
            let mission = Arc::new(Mission::new(mission_id, waypoints, *params, max)?);

            rover.guidance.lock().upload(mission.clone())?;
            rover.store.mission.set(Some(mission))?;
        }
        Tc::Start => {
            debug!("Recieved Start command");
            rover.guidance.lock().start(now_ms)?;
        }
        Tc::Pause => {
            debug!("Recieved Pause command");
            let mut guidance = rover.guidance.lock();
            guidance.pause(now_ms)?;
            rover.drive.lock().stop();
        }
        Tc::Resume => {
            debug!("Recieved Resume command");
            rover.guidance.lock().resume(now_ms)?;
        }
        Tc::Abort => {
            debug!("Recieved Abort command");
            let mut guidance = rover.guidance.lock();
            guidance.abort(now_ms);
            rover.drive.lock().stop();
        }
        Tc::ManualMode { enabled } => {
            let enabled = *enabled;

            // Held until the drive is stopped so no guidance tick lands in between
            let _guidance = rover.guidance.lock();

            rover.store.manual.modify(|m| {
                m.enabled = enabled;
                m.direction = DriveDirection::Stop;
                m.speed_pct = 0;
                m.received_ms = None;
            })?;
            rover.store.rover_state.modify(|rs| rs.manual_mode = enabled)?;

            info!("Manual mode {}", if enabled { "enabled" } else { "disabled" });
            rover.drive.lock().stop();
        }
        Tc::ManualDrive {
            direction,
            speed_pct,
        } => {
            let (direction, speed_pct) = (*direction, *speed_pct);

            let accepted = rover.store.manual.modify(|m| {
                if m.enabled {
                    m.direction = direction;
                    m.speed_pct = speed_pct;
                    m.received_ms = match direction {
                        DriveDirection::Stop => None,
                        _ => Some(now_ms),
                    };
                }
                m.enabled
            })?;

            if !accepted {
                return Err(TcExecError::NotInManualMode);
            }
            rover.store.rover_state.modify(|rs| rs.manual_timed_out = false)?;

            match manual_ctrl::speeds(direction, speed_pct) {
                Some((left, right)) => rover.apply_drive(left, right),
                None => rover.drive.lock().stop(),
            }
        }
    }

    rover.publish_guidance();

    Ok(())
}
