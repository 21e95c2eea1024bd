//! # Rover
//!
//! The composition root of the control core. A `Rover` owns the data store and every controller
//! for the life of the process, and exposes one method per periodic activity. The activities hold
//! a shared handle to the rover and never to each other.
//!
//! Controllers which several activities act on (drive control is stopped by safety, commanded by
//! guidance and manual control, and ticked by the inner loop) sit behind their own lock. Where a
//! method needs more than one they are taken in the order guidance, safety, drive.
//!
//! A guidance command is applied while the guidance lock is still held, so a pause, abort or
//! switch to manual mode, which take the same lock, is either seen by the tick or stops the drive
//! after it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

// Internal
use crate::{
    data_store::DataStore,
    drive_ctrl::{self, DriveCtrl, DriveCtrlError, MotorOutput, QuadEncoder, Side},
    guidance::{self, GuidanceCtrl, GuidanceError, GuidanceOutput, MissionState},
    safety::{self, SafetyActions, SafetyError, SafetyMonitor},
    tc_processor::{self, TcExecError},
    tm::TmPacket,
};
use comms_if::tc::{DriveDirection, Tc};
use util::{
    params::{self, LoadError},
    time::{Clock, Millis},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of every controller in the rover.
#[derive(Debug, Clone, Default)]
pub struct RoverParams {
    pub drive: drive_ctrl::Params,
    pub guidance: guidance::Params,
    pub safety: safety::Params,
}

pub struct Rover<M> {
    pub(crate) store: DataStore,
    pub(crate) drive: Mutex<DriveCtrl<M>>,
    pub(crate) guidance: Mutex<GuidanceCtrl>,
    pub(crate) safety: Mutex<SafetyMonitor>,
    clock: Arc<dyn Clock>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RoverError {
    #[error("Could not load parameters: {0}")]
    Load(#[from] LoadError),

    #[error("Could not create drive control: {0}")]
    DriveCtrl(#[from] DriveCtrlError),

    #[error("Could not create guidance: {0}")]
    Guidance(#[from] GuidanceError),

    #[error("Could not create the safety monitor: {0}")]
    Safety(#[from] SafetyError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoverParams {
    /// Load each controller's parameters from its file in the parameters directory.
    pub fn load() -> Result<Self, LoadError> {
        Ok(Self {
            drive: params::load("drive_ctrl.toml")?,
            guidance: params::load("guidance.toml")?,
            safety: params::load("safety.toml")?,
        })
    }
}

impl<M: MotorOutput> Rover<M> {
    pub fn new(params: RoverParams, motors: M, clock: Arc<dyn Clock>) -> Result<Self, RoverError> {
        Ok(Self {
            store: DataStore::default(),
            drive: Mutex::new(DriveCtrl::new(params.drive, motors)?),
            guidance: Mutex::new(GuidanceCtrl::new(params.guidance)?),
            safety: Mutex::new(SafetyMonitor::new(params.safety)?),
            clock,
        })
    }

    /// Allow drive control to move the motors.
    pub fn arm(&self) {
        self.drive.lock().arm();
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Handle to one side's encoder, for the edge source.
    pub fn encoder(&self, side: Side) -> Arc<QuadEncoder> {
        self.drive.lock().encoder(side)
    }

    pub fn mission_state(&self) -> MissionState {
        self.guidance.lock().state()
    }

    /// Run a closure against drive control.
    pub fn with_drive<R, F: FnOnce(&DriveCtrl<M>) -> R>(&self, f: F) -> R {
        f(&self.drive.lock())
    }

    // ---- ACTIVITIES ----

    /// Inner loop tick: safety checks, then the wheel velocity loops.
    pub fn inner_loop_tick(&self) -> (SafetyActions, drive_ctrl::StatusReport) {
        let actions = self.safety_tick();
        let report = self.drive_tick();
        (actions, report)
    }

    /// Run the safety monitor, stopping the drive if it asks to.
    pub fn safety_tick(&self) -> SafetyActions {
        let now_ms = self.now_ms();
        let obstacle = self.store.obstacle.get().ok();
        let manual = self.store.manual.get().ok();

        let actions = self.safety.lock().check(now_ms, obstacle, manual);

        if actions.stop {
            self.drive.lock().stop();
        }

        if actions.manual_timeout {
            let seen = manual.and_then(|m| m.received_ms);

            // Only clear the command that timed out, not one which arrived since
            self.store
                .manual
                .modify(|m| {
                    if m.received_ms == seen {
                        m.received_ms = None;
                        m.direction = DriveDirection::Stop;
                        m.speed_pct = 0;
                    }
                })
                .ok();
        }

        self.store
            .rover_state
            .modify(|rs| {
                rs.obstacle_stop = actions.obstacle_stop;
                if actions.manual_timeout {
                    rs.manual_timed_out = true;
                }
            })
            .ok();

        actions
    }

    /// Run the wheel velocity loops once and record the result.
    pub fn drive_tick(&self) -> drive_ctrl::StatusReport {
        let now_ms = self.now_ms();
        let report = self.drive.lock().update(now_ms);
        self.store.record_drive(&report).ok();
        report
    }

    /// Run guidance once and pass its output to drive control.
    ///
    /// Guidance output is dropped in manual mode, except for a stop.
    pub fn guidance_tick(&self) -> GuidanceOutput {
        let now_ms = self.now_ms();
        let position = self.store.position.get().ok();
        let orientation = self.store.orientation.get().ok();

        let mut guidance = self.guidance.lock();
        let output = guidance.tick(now_ms, position, orientation);
        self.store.record_guidance(&guidance.status()).ok();

        match output {
            GuidanceOutput::Hold => (),
            GuidanceOutput::Stop => self.drive.lock().stop(),
            GuidanceOutput::Drive { left, right } => match self.store.manual.get() {
                Ok(m) if m.enabled => trace!("Manual mode, guidance output dropped"),
                Ok(_) if guidance.state() == MissionState::Active => self.apply_drive(left, right),
                _ => (),
            },
        }

        output
    }

    /// Snapshot for the telemetry sink.
    pub fn telemetry(&self) -> TmPacket {
        TmPacket::from_store(&self.store)
    }

    /// Command intake.
    pub fn exec_tc(&self, tc: &Tc) -> Result<(), TcExecError> {
        tc_processor::exec(self, tc)
    }

    // ---- INTERNAL ----

    /// Command differential speeds unless an obstacle vetoes motion.
    pub(crate) fn apply_drive(&self, left: i16, right: i16) {
        // An unreadable obstacle record counts as an obstacle
        let blocked = match self.store.obstacle.get() {
            Ok(range) => self.safety.lock().is_obstacle(&range),
            Err(_) => true,
        };

        if blocked {
            debug!("Drive command ({}, {}) vetoed", left, right);
            return;
        }

        self.drive
            .lock()
            .set_differential_speeds(left as i32, right as i32);
    }

    /// Copy the guidance status into the store.
    pub(crate) fn publish_guidance(&self) {
        let status = self.guidance.lock().status();
        self.store.record_guidance(&status).ok();
    }
}
