//! # Scheduler
//!
//! Runs each periodic activity on its own named thread at a fixed period. Every cycle is timed,
//! the thread sleeps for whatever is left of the period and overruns are reported.
//!
//! Activities carry a priority rank reflecting how urgent they are relative to each other. The
//! host's thread priorities are left alone, the rank sets the spawn order and is logged so that a
//! target with a real-time scheduler can map it onto native priorities.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Periods of each activity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Units: milliseconds
    pub edge_source_period_ms: u64,
    pub inner_loop_period_ms: u64,
    pub guidance_period_ms: u64,
    pub orientation_period_ms: u64,
    pub gps_period_ms: u64,
    pub telemetry_period_ms: u64,
}

/// A set of periodic activities.
pub struct Scheduler {
    run: Arc<AtomicBool>,
    pending: Vec<Task>,
    running: Vec<(Activity, JoinHandle<u64>)>,
}

struct Task {
    activity: Activity,
    period: Duration,
    body: Box<dyn FnMut() + Send + 'static>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The periodic activities of the rover, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Activity {
    /// Source of encoder edges, standing in for the encoder interrupt.
    EdgeSource,

    /// Safety checks and the wheel velocity loops.
    InnerLoop,

    Guidance,
    OrientationIngest,
    GpsIngest,
    Telemetry,
}

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("Could not spawn the {0:?} thread: {1}")]
    Spawn(Activity, std::io::Error),

    #[error("The {0:?} activity panicked")]
    Panicked(Activity),

    #[error("The {0:?} activity has already been added")]
    Duplicate(Activity),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            edge_source_period_ms: 1,
            inner_loop_period_ms: 20,
            guidance_period_ms: 100,
            orientation_period_ms: 10,
            gps_period_ms: 1000,
            telemetry_period_ms: 1000,
        }
    }
}

impl Params {
    /// Period of the given activity.
    pub fn period(&self, activity: Activity) -> Duration {
        Duration::from_millis(match activity {
            Activity::EdgeSource => self.edge_source_period_ms,
            Activity::InnerLoop => self.inner_loop_period_ms,
            Activity::Guidance => self.guidance_period_ms,
            Activity::OrientationIngest => self.orientation_period_ms,
            Activity::GpsIngest => self.gps_period_ms,
            Activity::Telemetry => self.telemetry_period_ms,
        })
    }
}

impl Activity {
    /// Priority rank, higher is more urgent.
    pub fn priority(self) -> u8 {
        match self {
            Activity::EdgeSource => 6,
            Activity::InnerLoop => 5,
            Activity::Guidance => 4,
            Activity::OrientationIngest => 3,
            Activity::GpsIngest => 2,
            Activity::Telemetry => 1,
        }
    }

    /// Name given to the activity's thread.
    pub fn thread_name(self) -> &'static str {
        match self {
            Activity::EdgeSource => "edge_source",
            Activity::InnerLoop => "inner_loop",
            Activity::Guidance => "guidance",
            Activity::OrientationIngest => "orientation_in",
            Activity::GpsIngest => "gps_in",
            Activity::Telemetry => "telemetry",
        }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            run: Arc::new(AtomicBool::new(false)),
            pending: Vec::new(),
            running: Vec::new(),
        }
    }

    /// Add an activity, run every `period` once the scheduler is started.
    pub fn add<F>(&mut self, activity: Activity, period: Duration, body: F) -> Result<(), SchedError>
    where
        F: FnMut() + Send + 'static,
    {
        if self.pending.iter().any(|t| t.activity == activity)
            || self.running.iter().any(|(a, _)| *a == activity)
        {
            return Err(SchedError::Duplicate(activity));
        }

        self.pending.push(Task {
            activity,
            period,
            body: Box::new(body),
        });

        Ok(())
    }

    /// Spawn all added activities, most urgent first.
    pub fn start(&mut self) -> Result<(), SchedError> {
        self.run.store(true, Ordering::Release);

        let mut tasks: Vec<Task> = self.pending.drain(..).collect();
        tasks.sort_by_key(|t| std::cmp::Reverse(t.activity.priority()));

        for task in tasks {
            let activity = task.activity;
            info!(
                "Starting {:?} (priority {}, period {:?})",
                activity,
                activity.priority(),
                task.period
            );

            let run = self.run.clone();
            let handle = thread::Builder::new()
                .name(activity.thread_name().into())
                .spawn(move || run_periodic(task, run))
                .map_err(|e| SchedError::Spawn(activity, e))?;

            self.running.push((activity, handle));
        }

        Ok(())
    }

    /// Stop every activity and wait for their threads to finish.
    ///
    /// Returns the number of cycles each activity ran.
    pub fn stop(&mut self) -> Result<Vec<(Activity, u64)>, SchedError> {
        self.run.store(false, Ordering::Release);

        let mut cycles = Vec::new();
        for (activity, handle) in self.running.drain(..) {
            let n = handle.join().map_err(|_| SchedError::Panicked(activity))?;
            cycles.push((activity, n));
        }

        Ok(cycles)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.run.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn run_periodic(mut task: Task, run: Arc<AtomicBool>) -> u64 {
    let mut num_cycles = 0u64;

    while run.load(Ordering::Acquire) {
        let cycle_start = Instant::now();

        (task.body)();
        num_cycles += 1;

        let cycle_dur = cycle_start.elapsed();

        match task.period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "{:?} cycle overran by {:.06} s",
                task.activity,
                (cycle_dur - task.period).as_secs_f64()
            ),
        }
    }

    num_cycles
}
