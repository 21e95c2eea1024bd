//! # Telemetry
//!
//! A snapshot of the rover, assembled from the data store for an external telemetry sink. The
//! encoding and transport of the packet are left to the sink.

use serde::Serialize;

use crate::data_store::{DataStore, GpsPosition, Orientation, RoverState};

/// Telemetry packet
///
/// Records which could not be read in time are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct TmPacket {
    /// Seconds since the start of the session
    pub time_s: f64,

    pub rover: Option<RoverState>,
    pub position: Option<GpsPosition>,
    pub orientation: Option<Orientation>,

    pub mission_id: Option<String>,
    pub num_segments: usize,
    pub total_distance_m: f64,
}

impl TmPacket {
    /// Take a snapshot of the store.
    pub fn from_store(ds: &DataStore) -> Self {
        let mission = ds.mission.get().ok().flatten();

        Self {
            time_s: util::session::get_elapsed_seconds(),
            rover: ds.rover_state.get().ok(),
            position: ds.position.get().ok(),
            orientation: ds.orientation.get().ok(),
            mission_id: mission.as_ref().map(|m| m.id.clone()),
            num_segments: mission.as_ref().map(|m| m.segments.len()).unwrap_or(0),
            total_distance_m: mission.as_ref().map(|m| m.total_distance_m).unwrap_or(0.0),
        }
    }
}
