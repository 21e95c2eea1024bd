//! # Simulation plant
//!
//! A kinematic differential-drive rover for running the control core without hardware. The
//! plant takes the place of every external collaborator of the core:
//!
//! - `SimMotors` is the motor output driven by drive control.
//! - Stepping the plant turns the wheels and feeds quadrature edges to the encoders, in the same
//!   way the encoder interrupt would.
//! - The plant publishes position, heading and obstacle range into the data store through the
//!   same calls as the real sensor sources.
//!
//! Each wheel's speed follows its duty cycle with a first order lag, and duty below the motor's
//! dead-zone does not move it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use parking_lot::Mutex;
use serde::Deserialize;
use std::{f64::consts::PI, sync::Arc};

use crate::{
    data_store::DataStore,
    drive_ctrl::{self, MotorDemand, MotorOutput, QuadEncoder, Side, MAX_CMD, NUM_SIDES},
    guidance::geo::{LatLon, EARTH_RADIUS_M},
};
use util::{guarded::StoreError, maths::compass_deg, time::Millis};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Channel levels of successive quadrature states, in the forward direction.
const FORWARD_SEQUENCE: [(bool, bool); 4] =
    [(false, false), (true, false), (true, true), (false, true)];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulation parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Distance between the left and right wheels.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Time constant of the wheel speed response.
    ///
    /// Units: seconds
    pub wheel_time_const_s: f64,

    /// Smallest duty which turns the wheel.
    pub static_friction_duty: i16,

    pub start_lat_deg: f64,
    pub start_lon_deg: f64,
    pub start_heading_deg: f64,

    /// Constant obstacle range reported, zero for nothing in range.
    ///
    /// Units: centimeters
    pub obstacle_cm: f64,
}

/// Motor outputs of the simulated rover.
#[derive(Debug, Clone, Default)]
pub struct SimMotors {
    demands: Arc<Mutex<[MotorDemand; NUM_SIDES]>>,
}

/// The simulated rover.
pub struct SimPlant {
    params: Params,
    max_rpm: f64,
    counts_per_rev: f64,

    demands: Arc<Mutex<[MotorDemand; NUM_SIDES]>>,
    encoders: [Arc<QuadEncoder>; NUM_SIDES],

    /// Physical direction each encoder counts in when its wheel turns forward
    encoder_dir: [i64; NUM_SIDES],

    wheel_rpm: [f64; NUM_SIDES],
    count_residual: [f64; NUM_SIDES],
    phase: [usize; NUM_SIDES],

    origin: LatLon,
    north_m: f64,
    east_m: f64,
    heading_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            wheel_radius_m: 0.035,
            track_width_m: 0.2,
            wheel_time_const_s: 0.1,
            static_friction_duty: 30,
            start_lat_deg: 0.0,
            start_lon_deg: 0.0,
            start_heading_deg: 0.0,
            obstacle_cm: 0.0,
        }
    }
}

impl MotorOutput for SimMotors {
    fn write(&mut self, side: Side, demand: MotorDemand) {
        self.demands.lock()[side.index()] = demand;
    }

    fn brake_all(&mut self) {
        *self.demands.lock() = [MotorDemand::BRAKE; NUM_SIDES];
    }
}

impl SimPlant {
    /// Create a plant driven by `motors` and feeding the given encoders.
    ///
    /// The encoders must have been created with both channels low.
    pub fn new(
        params: Params,
        drive_params: &drive_ctrl::Params,
        motors: &SimMotors,
        encoders: [Arc<QuadEncoder>; NUM_SIDES],
    ) -> Self {
        let encoder_dir = [
            if encoders[0].is_reversed() { -1 } else { 1 },
            if encoders[1].is_reversed() { -1 } else { 1 },
        ];

        Self {
            origin: LatLon::new(params.start_lat_deg, params.start_lon_deg),
            heading_deg: compass_deg(params.start_heading_deg),
            params,
            max_rpm: drive_params.max_rpm,
            counts_per_rev: drive_params.counts_per_rev,
            demands: motors.demands.clone(),
            encoders,
            encoder_dir,
            wheel_rpm: [0.0; NUM_SIDES],
            count_residual: [0.0; NUM_SIDES],
            phase: [0; NUM_SIDES],
            north_m: 0.0,
            east_m: 0.0,
        }
    }

    /// Advance the simulation by `dt_s`.
    pub fn step(&mut self, dt_s: f64) {
        let demands = *self.demands.lock();
        let alpha = (dt_s / self.params.wheel_time_const_s).min(1.0);

        let mut wheel_speed_ms = [0.0; NUM_SIDES];

        for i in 0..NUM_SIDES {
            let duty = demands[i].signed();
            let target_rpm = if duty.abs() < self.params.static_friction_duty {
                0.0
            } else {
                duty as f64 / MAX_CMD as f64 * self.max_rpm
            };

            self.wheel_rpm[i] += (target_rpm - self.wheel_rpm[i]) * alpha;

            // Encoder edges for the distance turned this step
            let counts = self.wheel_rpm[i] / 60.0 * self.counts_per_rev * dt_s
                + self.count_residual[i];
            let whole = counts.trunc();
            self.count_residual[i] = counts - whole;
            self.emit_edges(i, whole as i64 * self.encoder_dir[i]);

            wheel_speed_ms[i] = self.wheel_rpm[i] / 60.0 * 2.0 * PI * self.params.wheel_radius_m;
        }

        let v_ms = (wheel_speed_ms[0] + wheel_speed_ms[1]) / 2.0;

        // Positive when turning clockwise seen from above, i.e. left faster than right
        let yaw_rate_rads = (wheel_speed_ms[0] - wheel_speed_ms[1]) / self.params.track_width_m;

        let heading_rad = self.heading_deg.to_radians();
        self.north_m += v_ms * heading_rad.cos() * dt_s;
        self.east_m += v_ms * heading_rad.sin() * dt_s;
        self.heading_deg = compass_deg(self.heading_deg + yaw_rate_rads.to_degrees() * dt_s);
    }

    /// Current true position.
    pub fn position(&self) -> LatLon {
        let lat_deg = self.origin.lat_deg + (self.north_m / EARTH_RADIUS_M).to_degrees();
        let lon_deg = self.origin.lon_deg
            + (self.east_m / (EARTH_RADIUS_M * self.origin.lat_deg.to_radians().cos()))
                .to_degrees();
        LatLon::new(lat_deg, lon_deg)
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    pub fn wheel_rpm(&self) -> [f64; NUM_SIDES] {
        self.wheel_rpm
    }

    /// Publish a position fix.
    pub fn publish_position(&self, ds: &DataStore, now_ms: Millis) -> Result<(), StoreError> {
        let pos = self.position();
        ds.publish_position(pos.lat_deg, pos.lon_deg, true, now_ms)
    }

    /// Publish a heading sample and the obstacle range.
    pub fn publish_orientation(&self, ds: &DataStore, now_ms: Millis) -> Result<(), StoreError> {
        ds.publish_orientation(self.heading_deg, true, now_ms)?;
        ds.publish_obstacle_distance(self.params.obstacle_cm, now_ms)
    }

    fn emit_edges(&mut self, side: usize, counts: i64) {
        let step = if counts >= 0 { 1 } else { 3 };

        for _ in 0..counts.abs() {
            self.phase[side] = (self.phase[side] + step) % 4;
            let (a, b) = FORWARD_SEQUENCE[self.phase[side]];
            self.encoders[side].on_edge(a, b);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_ctrl::DriveCtrl;

    fn plant(drive_params: &drive_ctrl::Params) -> (SimPlant, SimMotors, [Arc<QuadEncoder>; 2]) {
        let motors = SimMotors::default();
        let encoders = [
            Arc::new(QuadEncoder::new(false, false, drive_params.left_encoder_reversed)),
            Arc::new(QuadEncoder::new(false, false, drive_params.right_encoder_reversed)),
        ];
        let plant = SimPlant::new(Params::default(), drive_params, &motors, encoders.clone());
        (plant, motors, encoders)
    }

    #[test]
    fn test_forward_counts_positive_on_both_sides() {
        let dp = drive_ctrl::Params::default();
        let (mut plant, mut motors, encoders) = plant(&dp);

        motors.write(Side::Left, MotorDemand::from_signed(255));
        motors.write(Side::Right, MotorDemand::from_signed(255));

        for _ in 0..1000 {
            plant.step(0.001);
        }

        // Right encoder is mounted reversed, both must still count up
        assert!(encoders[0].get_position() > 0);
        assert!(encoders[1].get_position() > 0);
        assert!((encoders[0].get_position() - encoders[1].get_position()).abs() <= 1);

        // Straight north
        let pos = plant.position();
        assert!(pos.lat_deg > 0.0);
        assert!(pos.lon_deg.abs() < 1e-12);
        assert!(plant.heading_deg().abs() < 1e-9);
    }

    #[test]
    fn test_turns_right_when_left_faster() {
        let dp = drive_ctrl::Params::default();
        let (mut plant, mut motors, _) = plant(&dp);

        motors.write(Side::Left, MotorDemand::from_signed(200));
        motors.write(Side::Right, MotorDemand::from_signed(100));

        for _ in 0..100 {
            plant.step(0.01);
        }

        assert!(plant.heading_deg() > 0.0 && plant.heading_deg() < 180.0);
        assert!(plant.position().lon_deg > 0.0);
    }

    #[test]
    fn test_closed_loop_tracks_target() {
        let dp = drive_ctrl::Params::default();
        let motors = SimMotors::default();
        let mut dc = DriveCtrl::new(dp.clone(), motors.clone()).unwrap();
        let mut plant = SimPlant::new(
            Params::default(),
            &dp,
            &motors,
            [dc.encoder(Side::Left), dc.encoder(Side::Right)],
        );

        dc.arm();
        dc.set_differential_speeds(128, 128);

        let mut now: Millis = 0;
        dc.update(now);
        for _ in 0..200 {
            for _ in 0..dp.interval_ms {
                plant.step(0.001);
            }
            now += dp.interval_ms;
            dc.update(now);
        }
        let report = dc.report();

        // Half of the 200 rpm maximum
        for w in report.wheels.iter() {
            assert!((w.rpm - 100.0).abs() < 10.0, "wheel at {} rpm", w.rpm);
        }
    }
}
