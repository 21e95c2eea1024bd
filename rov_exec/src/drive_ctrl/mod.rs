//! # Drive control module
//!
//! Drive control is the inner loop of the rover. It turns a pair of signed differential speed
//! commands (one per side) into motor duty cycles, closing the loop on the wheel velocity measured
//! by a quadrature encoder on each side.
//!
//! The loop runs at a fixed interval. Each wheel's controller is a PID with feedforward, an
//! anti-windup clamp on the integral, derivative on measurement, a dead-zone compensation and a
//! stall detector. The `DriveCtrl` struct owns both wheel controllers and is the only writer of
//! the motor outputs.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod encoder;
mod output;
mod params;
mod state;
mod wheel;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use encoder::*;
pub use output::*;
pub use params::Params;
pub use state::*;
pub use wheel::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest magnitude of a differential speed command, and of a motor duty cycle.
pub const MAX_CMD: i16 = 255;

/// Number of driven sides.
pub const NUM_SIDES: usize = 2;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A side of the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Side {
    Left,
    Right,
}

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid drive control parameters: {0}")]
    InvalidParams(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Side {
    pub const ALL: [Side; NUM_SIDES] = [Side::Left, Side::Right];

    /// Index of the side in per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}
