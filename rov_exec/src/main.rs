//! Main rover-side executable entry point.
//!
//! # Architecture
//!
//! The executable is the composition root of the control core. It:
//!
//!     - Starts the session and logging
//!     - Loads the parameter files
//!     - Builds the rover against the simulation plant
//!     - Runs each periodic activity on the scheduler:
//!         - Edge source (simulation step)
//!         - Inner loop (safety and wheel velocity control)
//!         - Guidance
//!         - Orientation and obstacle ingest
//!         - GPS ingest
//!         - Telemetry
//!     - Uploads and starts the mission in `mission.toml`, then waits for it to end

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{sync::Arc, thread, time::Duration, time::Instant};

// Internal
use comms_if::tc::Tc;
use rov_lib::{
    drive_ctrl::Side,
    guidance::MissionState,
    sched::{self, Activity, Scheduler},
    sim::{self, SimMotors, SimPlant},
    Rover, RoverParams,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    time::{Clock, MonotonicClock},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How often the main thread checks whether the mission has ended.
const MISSION_POLL_PERIOD: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("rov_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("Rover Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let rover_params = RoverParams::load().wrap_err("Could not load rover params")?;
    let sched_params: sched::Params =
        util::params::load("sched.toml").wrap_err("Could not load scheduler params")?;
    let sim_params: sim::Params =
        util::params::load("sim.toml").wrap_err("Could not load simulation params")?;
    let mission: Tc = util::params::load("mission.toml").wrap_err("Could not load the mission")?;

    if !matches!(mission, Tc::UploadMission { .. }) {
        return Err(eyre!("mission.toml must hold an upload_mission command"));
    }

    info!("Parameters loaded");

    // ---- INITIALISE ROVER ----

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let motors = SimMotors::default();

    let rover = Arc::new(
        Rover::new(rover_params.clone(), motors.clone(), clock.clone())
            .wrap_err("Failed to initialise the rover")?,
    );

    let plant = Arc::new(Mutex::new(SimPlant::new(
        sim_params,
        &rover_params.drive,
        &motors,
        [rover.encoder(Side::Left), rover.encoder(Side::Right)],
    )));

    info!("Rover initialised");

    // ---- ACTIVITIES ----

    let mut scheduler = Scheduler::new();

    {
        let plant = plant.clone();
        let mut last_step = Instant::now();
        scheduler.add(
            Activity::EdgeSource,
            sched_params.period(Activity::EdgeSource),
            move || {
                let now = Instant::now();
                plant.lock().step((now - last_step).as_secs_f64());
                last_step = now;
            },
        )?;
    }

    {
        let rover = rover.clone();
        scheduler.add(
            Activity::InnerLoop,
            sched_params.period(Activity::InnerLoop),
            move || {
                rover.inner_loop_tick();
            },
        )?;
    }

    {
        let rover = rover.clone();
        scheduler.add(
            Activity::Guidance,
            sched_params.period(Activity::Guidance),
            move || {
                rover.guidance_tick();
            },
        )?;
    }

    {
        let rover = rover.clone();
        let plant = plant.clone();
        scheduler.add(
            Activity::OrientationIngest,
            sched_params.period(Activity::OrientationIngest),
            move || {
                if let Err(e) = plant.lock().publish_orientation(rover.store(), rover.now_ms()) {
                    warn!("Orientation sample dropped: {}", e);
                }
            },
        )?;
    }

    {
        let rover = rover.clone();
        let plant = plant.clone();
        scheduler.add(
            Activity::GpsIngest,
            sched_params.period(Activity::GpsIngest),
            move || {
                if let Err(e) = plant.lock().publish_position(rover.store(), rover.now_ms()) {
                    warn!("Position fix dropped: {}", e);
                }
            },
        )?;
    }

    {
        let rover = rover.clone();
        scheduler.add(
            Activity::Telemetry,
            sched_params.period(Activity::Telemetry),
            move || {
                let tm = rover.telemetry();

                if let Some(rs) = tm.rover {
                    info!(
                        "{:?} wp {}/{} progress {:.1} % xte {:.2} m cmd {:?} rpm [{:.0}, {:.0}]",
                        rs.mission_state,
                        rs.wp_index,
                        rs.num_waypoints,
                        rs.progress_pct,
                        rs.cross_track_m,
                        rs.speed_cmd,
                        rs.motor_rpm[0],
                        rs.motor_rpm[1]
                    );
                }

                match serde_json::to_string(&tm) {
                    Ok(s) => debug!("TM: {}", s),
                    Err(e) => warn!("Could not serialise TM: {}", e),
                }
            },
        )?;
    }

    scheduler.start().wrap_err("Failed to start the activities")?;

    // ---- MISSION ----

    rover.arm();

    rover
        .exec_tc(&mission)
        .wrap_err("The mission was rejected")?;
    rover
        .exec_tc(&Tc::Start)
        .wrap_err("The mission could not be started")?;

    info!("Mission started\n");

    let end_state = loop {
        thread::sleep(MISSION_POLL_PERIOD);

        match rover.mission_state() {
            s @ MissionState::Completed | s @ MissionState::Aborted => break s,
            _ => (),
        }
    };

    // ---- SHUTDOWN ----

    let cycles = scheduler.stop().wrap_err("Failed to stop the activities")?;
    for (activity, n) in cycles {
        info!("{:?} ran {} cycles", activity, n);
    }

    info!("Mission ended: {:?}", end_state);
    info!("End of execution");

    Ok(())
}
