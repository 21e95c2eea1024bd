//! # Motor outputs
//!
//! The hardware side of drive control. Drivers implement `MotorOutput`; drive control is the only
//! caller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{Side, MAX_CMD, NUM_SIDES};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An H-bridge style pair of motor outputs.
pub trait MotorOutput: Send {
    /// Set the direction and duty cycle of one side.
    fn write(&mut self, side: Side, demand: MotorDemand);

    /// Set both sides to zero duty with the bridge in brake.
    fn brake_all(&mut self);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Direction and duty cycle of a single motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorDemand {
    pub dir: MotorDir,

    /// Duty cycle, 0 to 255.
    pub duty: u8,
}

/// A motor output which only remembers what it was last told.
///
/// Used where no hardware is attached.
#[derive(Debug, Default, Clone)]
pub struct RecordingMotors {
    pub demands: [MotorDemand; NUM_SIDES],
    pub num_writes: usize,
    pub num_brakes: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotorDir {
    Forward,
    Backward,

    /// Both bridge inputs low.
    Coast,

    /// Both bridge inputs high.
    Brake,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorDemand {
    pub const BRAKE: MotorDemand = MotorDemand {
        dir: MotorDir::Brake,
        duty: 0,
    };

    /// Build a demand from a signed duty cycle, clamped to the output range.
    pub fn from_signed(duty: i16) -> Self {
        let duty = duty.clamp(-MAX_CMD, MAX_CMD);
        let dir = match duty {
            d if d > 0 => MotorDir::Forward,
            d if d < 0 => MotorDir::Backward,
            _ => MotorDir::Coast,
        };

        Self {
            dir,
            duty: duty.unsigned_abs() as u8,
        }
    }

    /// Signed duty cycle of the demand, zero when coasting or braking.
    pub fn signed(&self) -> i16 {
        match self.dir {
            MotorDir::Forward => self.duty as i16,
            MotorDir::Backward => -(self.duty as i16),
            MotorDir::Coast | MotorDir::Brake => 0,
        }
    }
}

impl Default for MotorDemand {
    fn default() -> Self {
        Self {
            dir: MotorDir::Coast,
            duty: 0,
        }
    }
}

impl MotorOutput for RecordingMotors {
    fn write(&mut self, side: Side, demand: MotorDemand) {
        self.demands[side.index()] = demand;
        self.num_writes += 1;
    }

    fn brake_all(&mut self) {
        self.demands = [MotorDemand::BRAKE; NUM_SIDES];
        self.num_brakes += 1;
    }
}

impl RecordingMotors {
    /// Signed duty cycles of the last demands, left then right.
    pub fn signed(&self) -> [i16; NUM_SIDES] {
        [self.demands[0].signed(), self.demands[1].signed()]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_signed() {
        assert_eq!(
            MotorDemand::from_signed(120),
            MotorDemand {
                dir: MotorDir::Forward,
                duty: 120
            }
        );
        assert_eq!(
            MotorDemand::from_signed(-300),
            MotorDemand {
                dir: MotorDir::Backward,
                duty: 255
            }
        );
        assert_eq!(MotorDemand::from_signed(0).dir, MotorDir::Coast);
        assert_eq!(MotorDemand::from_signed(-42).signed(), -42);
        assert_eq!(MotorDemand::BRAKE.signed(), 0);
    }
}
