//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{
    DriveCtrlError, MotorDemand, MotorOutput, Params, QuadEncoder, Side, WheelReport,
    WheelVelCtrl, MAX_CMD, NUM_SIDES,
};
use util::time::Millis;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
pub struct DriveCtrl<M> {
    params: Params,
    motors: M,

    encoders: [Arc<QuadEncoder>; NUM_SIDES],
    wheels: [WheelVelCtrl; NUM_SIDES],

    /// Last accepted speed command, left then right
    cmd: [i16; NUM_SIDES],

    armed: bool,
    stop_lock: bool,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub armed: bool,
    pub stop_lock: bool,
    pub cmd: [i16; NUM_SIDES],
    pub encoder_counts: [i32; NUM_SIDES],
    pub wheels: [WheelReport; NUM_SIDES],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<M: MotorOutput> DriveCtrl<M> {
    /// Create a new drive controller driving the given motors.
    ///
    /// Encoders are created with both channels low. The controller starts disarmed.
    pub fn new(params: Params, motors: M) -> Result<Self, DriveCtrlError> {
        params.are_valid()?;

        let encoders = [
            Arc::new(QuadEncoder::new(false, false, params.left_encoder_reversed)),
            Arc::new(QuadEncoder::new(false, false, params.right_encoder_reversed)),
        ];
        let wheels = [WheelVelCtrl::new(&params), WheelVelCtrl::new(&params)];

        Ok(Self {
            params,
            motors,
            encoders,
            wheels,
            cmd: [0; NUM_SIDES],
            armed: false,
            stop_lock: false,
        })
    }

    /// Handle to the encoder of one side, for the edge source to drive.
    pub fn encoder(&self, side: Side) -> Arc<QuadEncoder> {
        self.encoders[side.index()].clone()
    }

    /// Allow the controller to drive the motors.
    pub fn arm(&mut self) {
        if !self.armed {
            info!("DriveCtrl armed");
        }
        self.armed = true;
    }

    /// Stop and stop driving the motors.
    pub fn disarm(&mut self) {
        self.stop();
        if self.armed {
            info!("DriveCtrl disarmed");
        }
        self.armed = false;
    }

    /// Command the speed of each side, in the range -255 to 255.
    ///
    /// While the stop lock is engaged only a command with a non-zero side is accepted, and it
    /// releases the lock.
    pub fn set_differential_speeds(&mut self, left: i32, right: i32) {
        let cmd = [clamp_cmd(left), clamp_cmd(right)];

        if self.stop_lock {
            if cmd == [0, 0] {
                return;
            }
            info!("DriveCtrl stop lock released");
            self.stop_lock = false;
        }

        trace!("DriveCtrl command: {:?}", cmd);
        self.cmd = cmd;

        if self.params.closed_loop {
            for (wheel, c) in self.wheels.iter_mut().zip(cmd.iter()) {
                wheel.set_target(*c);
            }
        } else if self.armed {
            for side in Side::ALL.iter() {
                self.motors
                    .write(*side, MotorDemand::from_signed(cmd[side.index()]));
            }
        }
    }

    /// Stop immediately and engage the stop lock.
    ///
    /// Clears both wheel controllers and brakes the motors. `update` does nothing until a new
    /// non-zero command arrives.
    pub fn stop(&mut self) {
        for wheel in self.wheels.iter_mut() {
            wheel.reset();
        }
        self.cmd = [0; NUM_SIDES];
        self.motors.brake_all();

        if !self.stop_lock {
            info!("DriveCtrl stopped, stop lock engaged");
        } else {
            debug!("DriveCtrl stop requested while locked");
        }
        self.stop_lock = true;
    }

    /// Run one inner loop tick.
    ///
    /// Both wheels are updated back to back, then the motors are written. Nothing happens while
    /// disarmed or stop locked.
    pub fn update(&mut self, now_ms: Millis) -> StatusReport {
        if !self.armed || self.stop_lock {
            return self.report();
        }

        let mut outputs = [0i16; NUM_SIDES];

        if self.params.closed_loop {
            for i in 0..NUM_SIDES {
                outputs[i] = self.wheels[i].update(&self.encoders[i], now_ms);
            }
            for side in Side::ALL.iter() {
                self.motors
                    .write(*side, MotorDemand::from_signed(outputs[side.index()]));
            }
        } else {
            for i in 0..NUM_SIDES {
                self.wheels[i].observe(&self.encoders[i], now_ms, self.cmd[i]);
            }
        }

        let report = self.report();
        trace!(
            "DriveCtrl output: {:?}, rpm [{:.1}, {:.1}]",
            [report.wheels[0].output, report.wheels[1].output],
            report.wheels[0].rpm,
            report.wheels[1].rpm
        );

        report
    }

    /// Current status without running the loop.
    pub fn report(&self) -> StatusReport {
        let mut wheels = [self.wheels[0].report(), self.wheels[1].report()];

        // Nothing is being driven while locked or disarmed, whatever the controllers hold
        if !self.armed || self.stop_lock {
            for w in wheels.iter_mut() {
                w.output = 0;
            }
        }

        StatusReport {
            armed: self.armed,
            stop_lock: self.stop_lock,
            cmd: self.cmd,
            encoder_counts: [
                self.encoders[0].get_position(),
                self.encoders[1].get_position(),
            ],
            wheels,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_stop_locked(&self) -> bool {
        self.stop_lock
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn clamp_cmd(cmd: i32) -> i16 {
    cmd.clamp(-(MAX_CMD as i32), MAX_CMD as i32) as i16
}
