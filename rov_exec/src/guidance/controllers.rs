//! # Guidance controllers module
//!
//! The heading controller used by guidance.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fixed rate PID controller on heading error.
///
/// The controller is stepped once per guidance tick, so the integral and derivative are per tick
/// rather than per second.
#[derive(Debug, Serialize, Clone)]
pub struct HeadingPid {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Limit on the magnitude of the accumulated error
    integral_limit: f64,

    /// Limit on the magnitude of the output
    output_limit: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadingPid {
    /// Create a new controller from the guidance parameters.
    pub fn new(params: &Params) -> Self {
        Self {
            k_p: params.head_k_p,
            k_i: params.head_k_i,
            k_d: params.head_k_d,
            integral_limit: params.head_integral_limit,
            output_limit: params.max_cmd as f64,
            prev_error: None,
            integral: 0.0,
        }
    }

    /// Get the output of the controller for the given heading error in degrees.
    pub fn get(&mut self, error: f64) -> f64 {
        self.integral = (self.integral + error).clamp(-self.integral_limit, self.integral_limit);

        // No derivative on the first step after a reset
        let deriv = match self.prev_error {
            Some(e) => error - e,
            None => 0.0,
        };
        self.prev_error = Some(error);

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        out.clamp(-self.output_limit, self.output_limit)
    }

    /// Forget accumulated state, used when moving on to a new leg.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_terms() {
        let mut pid = HeadingPid::new(&Params::default());

        // P 0.5*10 + I 0.1*10, no D on first step
        assert!((pid.get(10.0) - 6.0).abs() < 1e-12);

        // P 0.5*20 + I 0.1*30 + D 0.05*10
        assert!((pid.get(20.0) - 13.5).abs() < 1e-12);
    }

    #[test]
    fn test_limits() {
        let mut pid = HeadingPid::new(&Params::default());

        for _ in 0..100 {
            pid.get(180.0);
        }
        assert_eq!(pid.integral(), 100.0);

        let mut pid = HeadingPid::new(&Params {
            head_k_p: 10.0,
            ..Default::default()
        });
        assert_eq!(pid.get(180.0), 255.0);
        assert_eq!(pid.get(-180.0), -255.0);
    }

    #[test]
    fn test_reset() {
        let mut pid = HeadingPid::new(&Params::default());
        pid.get(50.0);
        pid.get(50.0);
        pid.reset();

        assert_eq!(pid.integral(), 0.0);
        assert!((pid.get(0.0)).abs() < 1e-12);
    }
}
