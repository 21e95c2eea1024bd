//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use util::time::Millis;

use super::{DriveCtrlError, MAX_CMD};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- LOOP ----
    /// Period of the inner loop.
    ///
    /// Units: milliseconds
    pub interval_ms: Millis,

    /// If false the speed commands are written straight to the motors as duty cycles and the PID
    /// is bypassed.
    pub closed_loop: bool,

    // ---- WHEEL ----
    /// Encoder counts per output shaft revolution, after 4x decoding.
    pub counts_per_rev: f64,

    /// Free running wheel speed at full duty.
    ///
    /// Units: revolutions/minute
    pub max_rpm: f64,

    /// Invert the count direction of the left encoder.
    pub left_encoder_reversed: bool,

    /// Invert the count direction of the right encoder.
    pub right_encoder_reversed: bool,

    // ---- GAINS ----
    /// Proportional gain.
    ///
    /// Units: duty/(counts/interval)
    pub k_p: f64,

    /// Integral gain.
    pub k_i: f64,

    /// Derivative gain, applied to the change in measured speed.
    pub k_d: f64,

    /// Fraction of the full output the feedforward term reaches at the maximum target speed.
    pub ff_fraction: f64,

    // ---- DEAD-ZONE AND STALL ----
    /// Smallest duty cycle which overcomes static friction.
    pub min_duty: i16,

    /// Duty magnitude above which a wheel is expected to be turning.
    pub stall_duty: i16,

    /// Measured speed at or below which the wheel is considered stationary.
    ///
    /// Units: counts/interval
    pub stall_speed_counts: f64,

    /// How long the wheel must be stationary under load before a stall is flagged.
    ///
    /// Units: milliseconds
    pub stall_time_ms: Millis,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Maximum number of counts seen in one interval at the maximum wheel speed.
    pub fn max_counts_per_interval(&self) -> f64 {
        self.max_rpm / 60.0 * self.counts_per_rev * self.interval_s()
    }

    /// The loop interval in seconds.
    pub fn interval_s(&self) -> f64 {
        self.interval_ms as f64 / util::time::MILLIS_PER_SECOND
    }

    /// Check that the parameters describe a usable controller.
    pub fn are_valid(&self) -> Result<(), DriveCtrlError> {
        if self.interval_ms == 0 {
            return Err(DriveCtrlError::InvalidParams("interval_ms must be non-zero"));
        }
        if !(self.counts_per_rev > 0.0) || !(self.max_rpm > 0.0) {
            return Err(DriveCtrlError::InvalidParams(
                "counts_per_rev and max_rpm must be positive",
            ));
        }
        if self.k_p < 0.0 || self.k_i < 0.0 || self.k_d < 0.0 {
            return Err(DriveCtrlError::InvalidParams("gains must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.ff_fraction) {
            return Err(DriveCtrlError::InvalidParams("ff_fraction must be in [0, 1]"));
        }
        if self.min_duty < 0 || self.min_duty > MAX_CMD || self.stall_duty > MAX_CMD {
            return Err(DriveCtrlError::InvalidParams("duty limits outside the output range"));
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            interval_ms: 20,
            closed_loop: true,
            counts_per_rev: 1320.0,
            max_rpm: 200.0,
            left_encoder_reversed: false,
            right_encoder_reversed: true,
            k_p: 2.0,
            k_i: 0.5,
            k_d: 0.1,
            ff_fraction: 0.8,
            min_duty: 40,
            stall_duty: 150,
            stall_speed_counts: 1.0,
            stall_time_ms: 500,
        }
    }
}
