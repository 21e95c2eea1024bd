//! # Wheel velocity controller
//!
//! Fixed rate velocity loop for one wheel. Speeds are expressed in encoder counts per loop
//! interval so that the gains do not depend on the encoder resolution's relation to time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;
use util::time::{elapsed_ms, Millis};

use super::{Params, QuadEncoder, MAX_CMD};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Share of the output range the integral term may contribute.
const INTEGRAL_SHARE: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Velocity controller for one wheel.
#[derive(Debug, Clone)]
pub struct WheelVelCtrl {
    params: Params,

    max_counts_per_interval: f64,
    integral_limit: f64,

    /// Target speed in counts/interval
    target: f64,

    /// Most recent measured speed in counts/interval
    measured: f64,

    integral: f64,
    last_measured: f64,
    last_update: Option<Millis>,
    output: i16,

    stall_since: Option<Millis>,
    stalled: bool,
}

/// Snapshot of a wheel controller for telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WheelReport {
    pub target_counts: f64,
    pub measured_counts: f64,
    pub rpm: f64,
    pub output: i16,
    pub stalled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelVelCtrl {
    pub fn new(params: &Params) -> Self {
        let integral_limit = if params.k_i > 0.0 {
            INTEGRAL_SHARE * MAX_CMD as f64 / params.k_i
        } else {
            0.0
        };

        Self {
            params: params.clone(),
            max_counts_per_interval: params.max_counts_per_interval(),
            integral_limit,
            target: 0.0,
            measured: 0.0,
            integral: 0.0,
            last_measured: 0.0,
            last_update: None,
            output: 0,
            stall_since: None,
            stalled: false,
        }
    }

    /// Set the target from a signed speed command in the range -255 to 255.
    ///
    /// A zero target also clears the integral so that a stopped wheel does not hold a residual
    /// output.
    pub fn set_target(&mut self, cmd: i16) {
        let cmd = cmd.clamp(-MAX_CMD, MAX_CMD);
        self.target = cmd as f64 / MAX_CMD as f64 * self.max_counts_per_interval;

        if cmd == 0 {
            self.integral = 0.0;
        }
    }

    /// Run the controller.
    ///
    /// If less than one interval has passed since the last update the previous output is returned
    /// and the encoder is not sampled.
    pub fn update(&mut self, encoder: &QuadEncoder, now_ms: Millis) -> i16 {
        let measured = match self.sample(encoder, now_ms) {
            Some(m) => m,
            None => return self.output,
        };

        let error = self.target - measured;

        self.integral = (self.integral + error).clamp(-self.integral_limit, self.integral_limit);

        // Derivative on measurement, so a step in the target does not kick the output
        let deriv = -(measured - self.last_measured);
        self.last_measured = measured;

        let ff = self.params.ff_fraction * MAX_CMD as f64 * self.target
            / self.max_counts_per_interval;

        let raw = ff
            + self.params.k_p * error
            + self.params.k_i * self.integral
            + self.params.k_d * deriv;

        let mut output = raw.clamp(-(MAX_CMD as f64), MAX_CMD as f64).round() as i16;

        if self.target != 0.0 && output.abs() < self.params.min_duty {
            output = self.params.min_duty * self.target.signum() as i16;
        }

        self.output = output;
        self.check_stall(now_ms);

        output
    }

    /// Sample the encoder without running the controller. Used in open loop so the speed is still
    /// reported.
    pub fn observe(&mut self, encoder: &QuadEncoder, now_ms: Millis, output: i16) {
        if let Some(m) = self.sample(encoder, now_ms) {
            self.last_measured = m;
            self.output = output;
            self.check_stall(now_ms);
        }
    }

    /// Return to the initial state. The next update takes a fresh encoder baseline.
    pub fn reset(&mut self) {
        self.target = 0.0;
        self.measured = 0.0;
        self.integral = 0.0;
        self.last_measured = 0.0;
        self.last_update = None;
        self.output = 0;
        self.stall_since = None;
        self.stalled = false;
    }

    pub fn output(&self) -> i16 {
        self.output
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Measured speed in revolutions/minute.
    pub fn rpm(&self) -> f64 {
        self.measured / self.params.counts_per_rev / self.params.interval_s() * 60.0
    }

    pub fn report(&self) -> WheelReport {
        WheelReport {
            target_counts: self.target,
            measured_counts: self.measured,
            rpm: self.rpm(),
            output: self.output,
            stalled: self.stalled,
        }
    }

    /// Take the encoder delta if an interval has passed, normalised to counts per interval.
    fn sample(&mut self, encoder: &QuadEncoder, now_ms: Millis) -> Option<f64> {
        let measured = match self.last_update {
            None => {
                // New baseline, whatever moved before now is not part of this loop
                encoder.get_position_delta();
                0.0
            }
            Some(then) => {
                let elapsed = elapsed_ms(now_ms, then);
                if elapsed < self.params.interval_ms {
                    return None;
                }

                encoder.get_position_delta() as f64 * self.params.interval_ms as f64
                    / elapsed as f64
            }
        };

        self.last_update = Some(now_ms);
        self.measured = measured;

        Some(measured)
    }

    fn check_stall(&mut self, now_ms: Millis) {
        let loaded = self.output.abs() >= self.params.stall_duty;
        let stationary = self.measured.abs() <= self.params.stall_speed_counts;

        if !(loaded && stationary) {
            if self.stalled {
                info!("Wheel stall cleared");
            }
            self.stall_since = None;
            self.stalled = false;
            return;
        }

        match self.stall_since {
            None => self.stall_since = Some(now_ms),
            Some(since) => {
                if !self.stalled && elapsed_ms(now_ms, since) >= self.params.stall_time_ms {
                    warn!(
                        "Wheel stalled: output {} with {:.1} counts/interval for {} ms",
                        self.output,
                        self.measured,
                        elapsed_ms(now_ms, since)
                    );
                    self.stalled = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FORWARD: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    /// Encoder with a helper to move it forward by a number of counts.
    struct TestWheel {
        enc: QuadEncoder,
        phase: usize,
    }

    impl TestWheel {
        fn new() -> Self {
            Self {
                enc: QuadEncoder::new(false, false, false),
                phase: 3,
            }
        }

        fn advance(&mut self, counts: usize) {
            for _ in 0..counts {
                self.phase = (self.phase + 1) % 4;
                let (a, b) = FORWARD[self.phase];
                self.enc.on_edge(a, b);
            }
        }
    }

    #[test]
    fn test_zero_target_stays_zero() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let wheel = TestWheel::new();

        let mut now = 0;
        for _ in 0..100 {
            assert_eq!(ctrl.update(&wheel.enc, now), 0);
            now += params.interval_ms;
        }
        assert!(!ctrl.is_stalled());
    }

    #[test]
    fn test_early_call_reuses_output() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let mut wheel = TestWheel::new();

        ctrl.set_target(200);
        let first = ctrl.update(&wheel.enc, 0);
        assert!(first > 0);

        // Movement inside the interval is not consumed by an early call
        wheel.advance(10);
        assert_eq!(ctrl.update(&wheel.enc, params.interval_ms - 1), first);
        assert_eq!(wheel.enc.get_position_delta(), 10);
    }

    #[test]
    fn test_feedforward_dominates_at_speed() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let mut wheel = TestWheel::new();

        // Half speed target is 44 counts/interval
        ctrl.set_target(128);
        ctrl.update(&wheel.enc, 0);

        wheel.advance(44);
        let out = ctrl.update(&wheel.enc, params.interval_ms);

        // Feedforward alone is ~102, the rest is small corrections
        assert!((out - 102).abs() < 40, "output was {}", out);
    }

    #[test]
    fn test_dead_zone_follows_target_sign() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let wheel = TestWheel::new();

        ctrl.set_target(3);
        assert_eq!(ctrl.update(&wheel.enc, 0), params.min_duty);

        ctrl.reset();
        ctrl.set_target(-3);
        assert_eq!(ctrl.update(&wheel.enc, 0), -params.min_duty);
    }

    #[test]
    fn test_integral_bounded() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let wheel = TestWheel::new();

        ctrl.set_target(255);
        let mut now = 0;
        for _ in 0..1000 {
            ctrl.update(&wheel.enc, now);
            now += params.interval_ms;
        }

        assert!(params.k_i * ctrl.integral <= INTEGRAL_SHARE * MAX_CMD as f64 + 1e-9);
        assert_eq!(ctrl.output(), MAX_CMD);
    }

    #[test]
    fn test_stall_detected_and_cleared() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let mut wheel = TestWheel::new();

        ctrl.set_target(255);
        let mut now = 0;
        while now < params.stall_time_ms {
            ctrl.update(&wheel.enc, now);
            now += params.interval_ms;
            assert!(!ctrl.is_stalled());
        }
        ctrl.update(&wheel.enc, now);
        assert!(ctrl.is_stalled());

        wheel.advance(80);
        now += params.interval_ms;
        ctrl.update(&wheel.enc, now);
        assert!(!ctrl.is_stalled());
    }

    #[test]
    fn test_clock_wrap() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let mut wheel = TestWheel::new();

        let start = u32::MAX - 5;
        ctrl.update(&wheel.enc, start);

        // 20 ms later across the wrap is a normal interval, not a huge negative one
        wheel.advance(20);
        ctrl.update(&wheel.enc, start.wrapping_add(params.interval_ms));
        assert!((ctrl.report().measured_counts - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_late_update_normalised() {
        let params = Params::default();
        let mut ctrl = WheelVelCtrl::new(&params);
        let mut wheel = TestWheel::new();

        ctrl.update(&wheel.enc, 0);
        wheel.advance(40);
        ctrl.update(&wheel.enc, 2 * params.interval_ms);
        assert!((ctrl.report().measured_counts - 20.0).abs() < 1e-9);

        // 20 counts/interval at 1320 counts/rev and 20 ms is 1000 counts/s
        assert!((ctrl.rpm() - 1000.0 / 1320.0 * 60.0).abs() < 1e-6);
    }
}
