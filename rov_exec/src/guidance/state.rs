//! # Guidance state
//!
//! Mission state machine and the per-tick steering computation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{
    geo::{bearing_deg, cross_track_m, haversine_m, LatLon},
    GuidanceError, HeadingPid, Mission, MissionState, Params,
};
use crate::data_store::{GpsPosition, Orientation};
use util::{
    maths::norm_angle_deg,
    time::{elapsed_ms, Millis, MILLIS_PER_SECOND},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Guidance state
pub struct GuidanceCtrl {
    params: Params,
    pid: HeadingPid,

    state: MissionState,
    mission: Option<Arc<Mission>>,
    wp_index: usize,

    /// Active time accumulated before the current active period
    active_accum_ms: Millis,

    /// Start of the current active period
    active_since: Option<Millis>,

    status: GuidanceStatus,
}

/// Guidance telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GuidanceStatus {
    pub state: MissionState,
    pub navigating: bool,
    pub wp_index: usize,
    pub num_waypoints: usize,
    pub progress_pct: f64,
    pub distance_to_target_m: f64,
    pub bearing_to_target_deg: f64,
    pub cross_track_m: f64,
    pub heading_error_deg: f64,
    pub left_cmd: i16,
    pub right_cmd: i16,
    pub eta_s: f64,
    pub elapsed_active_s: f64,

    /// Cross track error is larger than the mission's threshold
    pub xte_limit_exceeded: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What guidance wants from drive control after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceOutput {
    /// Leave drive control as it is.
    Hold,

    /// Command these differential speeds.
    Drive { left: i16, right: i16 },

    /// Stop the drive.
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GuidanceCtrl {
    pub fn new(params: Params) -> Result<Self, GuidanceError> {
        params.are_valid()?;

        Ok(Self {
            pid: HeadingPid::new(&params),
            params,
            state: MissionState::Idle,
            mission: None,
            wp_index: 0,
            active_accum_ms: 0,
            active_since: None,
            status: GuidanceStatus::default(),
        })
    }

    /// Load a new mission, replacing any previous one.
    ///
    /// Rejected while a mission is active or paused.
    pub fn upload(&mut self, mission: Arc<Mission>) -> Result<(), GuidanceError> {
        match self.state {
            MissionState::Active | MissionState::Paused => {
                return Err(GuidanceError::MissionInProgress(self.state))
            }
            _ => (),
        }

        if mission.num_waypoints() > self.params.max_waypoints {
            return Err(GuidanceError::TooManyWaypoints(
                mission.num_waypoints(),
                self.params.max_waypoints,
            ));
        }

        info!(
            "Mission \"{}\" loaded: {} waypoints, {:.1} m",
            mission.id,
            mission.num_waypoints(),
            mission.total_distance_m
        );

        self.mission = Some(mission);
        self.wp_index = 0;
        self.active_accum_ms = 0;
        self.active_since = None;
        self.pid.reset();
        self.status = GuidanceStatus::default();
        self.transition(MissionState::Planned);

        Ok(())
    }

    /// Start a planned mission. Starting a paused mission resumes it.
    pub fn start(&mut self, now_ms: Millis) -> Result<(), GuidanceError> {
        match self.state {
            MissionState::Planned => {
                self.wp_index = 0;
                self.pid.reset();
                self.active_since = Some(now_ms);
                self.transition(MissionState::Active);
                Ok(())
            }
            MissionState::Paused => self.resume(now_ms),
            from => Err(GuidanceError::InvalidTransition {
                from,
                event: "start",
            }),
        }
    }

    /// Pause an active mission. The drive should be stopped by the caller.
    pub fn pause(&mut self, now_ms: Millis) -> Result<(), GuidanceError> {
        match self.state {
            MissionState::Active => {
                self.bank_active_time(now_ms);
                self.transition(MissionState::Paused);
                Ok(())
            }
            from => Err(GuidanceError::InvalidTransition {
                from,
                event: "pause",
            }),
        }
    }

    /// Resume a paused mission. Resuming a planned mission starts it.
    pub fn resume(&mut self, now_ms: Millis) -> Result<(), GuidanceError> {
        match self.state {
            MissionState::Paused => {
                // The rover may have drifted while paused, don't carry old error history
                self.pid.reset();
                self.active_since = Some(now_ms);
                self.transition(MissionState::Active);
                Ok(())
            }
            MissionState::Planned => self.start(now_ms),
            from => Err(GuidanceError::InvalidTransition {
                from,
                event: "resume",
            }),
        }
    }

    /// Abort the mission from any state. The drive should be stopped by the caller.
    pub fn abort(&mut self, now_ms: Millis) {
        if self.state == MissionState::Active {
            self.bank_active_time(now_ms);
        }
        self.transition(MissionState::Aborted);
    }

    /// Run one guidance tick.
    ///
    /// `position` and `orientation` are `None` if they could not be read this cycle.
    pub fn tick(
        &mut self,
        now_ms: Millis,
        position: Option<GpsPosition>,
        orientation: Option<Orientation>,
    ) -> GuidanceOutput {
        if self.state != MissionState::Active {
            return GuidanceOutput::Hold;
        }

        let mission = match self.mission {
            Some(ref m) => m.clone(),
            None => {
                warn!("Active mission has no waypoints, aborting");
                self.abort(now_ms);
                return GuidanceOutput::Stop;
            }
        };

        // ---- TIMEOUT ----

        let elapsed_active = self.elapsed_active_ms(now_ms);
        self.status.elapsed_active_s = elapsed_active as f64 / MILLIS_PER_SECOND;

        if elapsed_active as u64 >= mission.params.mission_timeout_s as u64 * 1000 {
            warn!(
                "Mission \"{}\" timed out after {} s, aborting",
                mission.id, mission.params.mission_timeout_s
            );
            self.abort(now_ms);
            return GuidanceOutput::Stop;
        }

        // ---- SENSOR CHECKS ----

        let (pos, heading_deg) = match self.check_sensors(now_ms, position, orientation) {
            Some(s) => s,
            None => return GuidanceOutput::Hold,
        };

        // ---- STEERING ----

        let target = mission.waypoints[self.wp_index];

        let distance_m = haversine_m(pos, target);
        let bearing = bearing_deg(pos, target);
        let xte_m = cross_track_m(distance_m, bearing, heading_deg);

        let heading_error =
            norm_angle_deg(norm_angle_deg(bearing - heading_deg) + self.params.k_xte * xte_m);

        let out = self.pid.get(heading_error);

        let base = self.params.base_speed as f64;
        let max = self.params.max_cmd as f64;
        let left = (base + out).clamp(0.0, max).round() as i16;
        let right = (base - out).clamp(0.0, max).round() as i16;

        trace!(
            "Guidance: wp {} dist {:.2} m, brg {:.1}, hdg {:.1}, xte {:.2} m, err {:.1} -> ({}, {})",
            self.wp_index,
            distance_m,
            bearing,
            heading_deg,
            xte_m,
            heading_error,
            left,
            right
        );

        self.status.distance_to_target_m = distance_m;
        self.status.bearing_to_target_deg = bearing;
        self.status.cross_track_m = xte_m;
        self.status.heading_error_deg = heading_error;
        self.status.left_cmd = left;
        self.status.right_cmd = right;
        self.status.xte_limit_exceeded = xte_m.abs() > mission.params.cte_threshold_m;

        // ---- WAYPOINT SEQUENCING ----

        if distance_m <= self.params.waypoint_threshold_m {
            info!(
                "Waypoint {} of {} reached",
                self.wp_index + 1,
                mission.num_waypoints()
            );

            self.wp_index += 1;
            self.pid.reset();

            if self.wp_index >= mission.num_waypoints() {
                self.bank_active_time(now_ms);
                self.transition(MissionState::Completed);
                self.update_progress(&mission, 0.0);
                self.status.left_cmd = 0;
                self.status.right_cmd = 0;
                return GuidanceOutput::Stop;
            }

            // Distance to the next target is only known next tick
            let next = haversine_m(pos, mission.waypoints[self.wp_index]);
            self.update_progress(&mission, next);
        } else {
            self.update_progress(&mission, distance_m);
        }

        GuidanceOutput::Drive { left, right }
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    pub fn mission(&self) -> Option<Arc<Mission>> {
        self.mission.clone()
    }

    pub fn wp_index(&self) -> usize {
        self.wp_index
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn status(&self) -> GuidanceStatus {
        self.status
    }

    /// Time spent active, excluding pauses.
    pub fn elapsed_active_ms(&self, now_ms: Millis) -> Millis {
        match self.active_since {
            Some(since) => self
                .active_accum_ms
                .saturating_add(elapsed_ms(now_ms, since)),
            None => self.active_accum_ms,
        }
    }

    fn transition(&mut self, to: MissionState) {
        if to != self.state {
            info!("Mission state {:?} -> {:?}", self.state, to);
        }
        self.state = to;

        self.status.state = to;
        self.status.navigating = to == MissionState::Active;
        self.status.wp_index = self.wp_index;
        self.status.num_waypoints = self
            .mission
            .as_ref()
            .map(|m| m.num_waypoints())
            .unwrap_or(0);
    }

    fn bank_active_time(&mut self, now_ms: Millis) {
        self.active_accum_ms = self.elapsed_active_ms(now_ms);
        self.active_since = None;
        self.status.elapsed_active_s = self.active_accum_ms as f64 / MILLIS_PER_SECOND;
    }

    fn update_progress(&mut self, mission: &Mission, distance_m: f64) {
        let progress = mission.progress(self.wp_index, distance_m);
        self.status.wp_index = self.wp_index;
        self.status.progress_pct = progress.pct;
        self.status.eta_s = mission.eta_s(progress.remaining_m);
    }

    /// Valid, fresh position and heading, or `None` if this tick must be skipped.
    fn check_sensors(
        &self,
        now_ms: Millis,
        position: Option<GpsPosition>,
        orientation: Option<Orientation>,
    ) -> Option<(LatLon, f64)> {
        let (position, orientation) = match (position, orientation) {
            (Some(p), Some(o)) => (p, o),
            _ => {
                debug!("Position or orientation unavailable, guidance tick skipped");
                return None;
            }
        };

        if !position.valid || !orientation.valid {
            warn!(
                "Invalid sensor data (position valid: {}, orientation valid: {}), holding",
                position.valid, orientation.valid
            );
            return None;
        }

        let pos_age = elapsed_ms(now_ms, position.timestamp_ms);
        let orient_age = elapsed_ms(now_ms, orientation.timestamp_ms);
        if pos_age > self.params.max_position_age_ms
            || orient_age > self.params.max_orientation_age_ms
        {
            warn!(
                "Stale sensor data (position {} ms, orientation {} ms old), holding",
                pos_age, orient_age
            );
            return None;
        }

        Some((
            LatLon::new(position.lat_deg, position.lon_deg),
            orientation.heading_deg,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tc::{MissionParams, WaypointSpec};

    fn ctrl_with(wps: &[WaypointSpec], params: MissionParams) -> GuidanceCtrl {
        let mut g = GuidanceCtrl::new(Params::default()).unwrap();
        let m = Mission::new("test", wps, params, 10).unwrap();
        g.upload(Arc::new(m)).unwrap();
        g
    }

    fn pos(lat: f64, lon: f64, t: Millis) -> Option<GpsPosition> {
        Some(GpsPosition {
            lat_deg: lat,
            lon_deg: lon,
            valid: true,
            timestamp_ms: t,
        })
    }

    fn hdg(deg: f64, t: Millis) -> Option<Orientation> {
        Some(Orientation {
            heading_deg: deg,
            valid: true,
            timestamp_ms: t,
        })
    }

    #[test]
    fn test_on_heading_drives_straight() {
        let mut g = ctrl_with(&[WaypointSpec::new(0.0001, 0.0)], MissionParams::default());
        g.start(0).unwrap();

        let out = g.tick(100, pos(0.0, 0.0, 100), hdg(0.0, 100));
        assert_eq!(
            out,
            GuidanceOutput::Drive {
                left: 100,
                right: 100
            }
        );

        let status = g.status();
        assert!(status.bearing_to_target_deg.abs() < 1e-9);
        assert!(status.heading_error_deg.abs() < 1e-9);
        assert!((status.distance_to_target_m - 11.119).abs() < 0.01);
    }

    #[test]
    fn test_turns_towards_target() {
        // Target to the east while heading north, left side must speed up
        let mut g = ctrl_with(&[WaypointSpec::new(0.0, 0.001)], MissionParams::default());
        g.start(0).unwrap();

        match g.tick(100, pos(0.0, 0.0, 100), hdg(0.0, 100)) {
            GuidanceOutput::Drive { left, right } => assert!(left > right),
            o => panic!("Unexpected output {:?}", o),
        }
    }

    #[test]
    fn test_state_machine() {
        let mut g = GuidanceCtrl::new(Params::default()).unwrap();
        assert_eq!(g.state(), MissionState::Idle);
        assert!(g.start(0).is_err());
        assert!(g.pause(0).is_err());

        let m = Arc::new(
            Mission::new(
                "m",
                &[WaypointSpec::new(1.0, 1.0)],
                MissionParams::default(),
                10,
            )
            .unwrap(),
        );
        g.upload(m.clone()).unwrap();
        assert_eq!(g.state(), MissionState::Planned);

        g.start(0).unwrap();
        assert_eq!(g.state(), MissionState::Active);
        assert_eq!(
            g.upload(m.clone()),
            Err(GuidanceError::MissionInProgress(MissionState::Active))
        );

        g.pause(1000).unwrap();
        assert_eq!(g.state(), MissionState::Paused);
        assert!(g.upload(m.clone()).is_err());

        g.resume(5000).unwrap();
        assert_eq!(g.state(), MissionState::Active);
        assert_eq!(g.elapsed_active_ms(6000), 2000);

        g.abort(6000);
        assert_eq!(g.state(), MissionState::Aborted);
        assert!(g.resume(7000).is_err());

        // Aborted is left by planning a new mission
        g.upload(m).unwrap();
        assert_eq!(g.state(), MissionState::Planned);
    }

    #[test]
    fn test_not_active_holds() {
        let mut g = ctrl_with(&[WaypointSpec::new(0.0001, 0.0)], MissionParams::default());
        assert_eq!(
            g.tick(0, pos(0.0, 0.0, 0), hdg(0.0, 0)),
            GuidanceOutput::Hold
        );
    }

    #[test]
    fn test_invalid_or_stale_sensors_hold() {
        let mut g = ctrl_with(&[WaypointSpec::new(0.0001, 0.0)], MissionParams::default());
        g.start(0).unwrap();

        let mut bad = pos(0.0, 0.0, 100);
        if let Some(ref mut p) = bad {
            p.valid = false;
        }
        assert_eq!(g.tick(100, bad, hdg(0.0, 100)), GuidanceOutput::Hold);
        assert_eq!(g.tick(100, None, hdg(0.0, 100)), GuidanceOutput::Hold);

        // Orientation older than allowed
        assert_eq!(
            g.tick(2000, pos(0.0, 0.0, 2000), hdg(0.0, 1000)),
            GuidanceOutput::Hold
        );
        assert_eq!(g.state(), MissionState::Active);
    }

    #[test]
    fn test_waypoints_visited_in_order() {
        let wps = [
            WaypointSpec::new(0.0001, 0.0),
            WaypointSpec::new(0.0002, 0.0),
            WaypointSpec::new(0.0003, 0.0),
        ];
        let mut g = ctrl_with(&wps, MissionParams::default());
        g.start(0).unwrap();

        let mut t = 0;
        for (i, wp) in wps.iter().enumerate() {
            assert_eq!(g.wp_index(), i);
            t += 100;
            let out = g.tick(t, pos(wp.lat_deg, wp.lon_deg, t), hdg(0.0, t));

            if i + 1 < wps.len() {
                assert!(matches!(out, GuidanceOutput::Drive { .. }));
            } else {
                assert_eq!(out, GuidanceOutput::Stop);
            }
        }

        assert_eq!(g.state(), MissionState::Completed);
        assert_eq!(g.status().progress_pct, 100.0);
        assert!(!g.status().navigating);
    }

    #[test]
    fn test_progress_reported() {
        let wps = [WaypointSpec::new(0.0, 0.0), WaypointSpec::new(0.0002, 0.0)];
        let mut g = ctrl_with(&wps, MissionParams::default());
        g.start(0).unwrap();

        g.tick(100, pos(0.0, 0.0, 100), hdg(0.0, 100));
        assert_eq!(g.wp_index(), 1);

        g.tick(200, pos(0.0001, 0.0, 200), hdg(0.0, 200));
        let s = g.status();
        assert!((s.progress_pct - 50.0).abs() < 0.01);
        assert!((s.eta_s - 11.12).abs() < 0.05);
    }

    #[test]
    fn test_timeout_aborts() {
        let params = MissionParams {
            mission_timeout_s: 10,
            ..Default::default()
        };
        let mut g = ctrl_with(&[WaypointSpec::new(0.001, 0.0)], params);
        g.start(0).unwrap();

        let out = g.tick(9_900, pos(0.0, 0.0, 9_900), hdg(0.0, 9_900));
        assert!(matches!(out, GuidanceOutput::Drive { .. }));

        let out = g.tick(10_000, pos(0.0, 0.0, 10_000), hdg(0.0, 10_000));
        assert_eq!(out, GuidanceOutput::Stop);
        assert_eq!(g.state(), MissionState::Aborted);
    }

    #[test]
    fn test_xte_limit_reported() {
        let params = MissionParams {
            cte_threshold_m: 1.0,
            ..Default::default()
        };
        // Target ~111 m east while heading north
        let mut g = ctrl_with(&[WaypointSpec::new(0.0, 0.001)], params);
        g.start(0).unwrap();
        g.tick(100, pos(0.0, 0.0, 100), hdg(0.0, 100));

        assert!(g.status().xte_limit_exceeded);
        assert_eq!(g.state(), MissionState::Active);
    }
}
