//! # Mission
//!
//! An uploaded mission: the waypoints, the per-mission parameters and the geometry of the path
//! between them. A mission is immutable once built, a new upload replaces it wholesale.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::{MissionParams, WaypointSpec};
use serde::Serialize;

use super::{
    geo::{bearing_deg, haversine_m, LatLon},
    GuidanceError,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Mission {
    pub id: String,
    pub waypoints: Vec<LatLon>,
    pub params: MissionParams,

    /// Legs between consecutive waypoints, one fewer than the waypoints.
    pub segments: Vec<PathSegment>,

    /// Sum of all segment lengths
    pub total_distance_m: f64,
}

/// Precomputed geometry of the leg between two consecutive waypoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PathSegment {
    pub start: LatLon,
    pub end: LatLon,
    pub distance_m: f64,
    pub bearing_deg: f64,
    pub speed_mps: f64,
}

/// Where the rover is along the mission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Percentage of the mission completed
    pub pct: f64,

    /// Distance still to travel, including the current leg
    pub remaining_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Mission {
    /// Build a mission, checking it fits in the waypoint store.
    ///
    /// The waypoints are expected to have passed intake validation.
    pub fn new(
        id: &str,
        waypoints: &[WaypointSpec],
        params: MissionParams,
        max_waypoints: usize,
    ) -> Result<Self, GuidanceError> {
        if waypoints.is_empty() {
            return Err(GuidanceError::EmptyMission);
        }
        if waypoints.len() > max_waypoints {
            return Err(GuidanceError::TooManyWaypoints(
                waypoints.len(),
                max_waypoints,
            ));
        }

        let waypoints: Vec<LatLon> = waypoints
            .iter()
            .map(|w| LatLon::new(w.lat_deg, w.lon_deg))
            .collect();

        let segments: Vec<PathSegment> = waypoints
            .windows(2)
            .map(|w| PathSegment {
                start: w[0],
                end: w[1],
                distance_m: haversine_m(w[0], w[1]),
                bearing_deg: bearing_deg(w[0], w[1]),
                speed_mps: params.speed_mps,
            })
            .collect();

        let total_distance_m = segments.iter().map(|s| s.distance_m).sum();

        Ok(Self {
            id: id.to_string(),
            waypoints,
            params,
            segments,
            total_distance_m,
        })
    }

    pub fn num_waypoints(&self) -> usize {
        self.waypoints.len()
    }

    /// Progress while heading for waypoint `target_index`, `distance_m` away from it.
    ///
    /// The leg to the first waypoint has no known start, so it counts as no progress. Missions
    /// with a single waypoint, or no distance between waypoints, progress by waypoint count.
    pub fn progress(&self, target_index: usize, distance_m: f64) -> Progress {
        if target_index >= self.waypoints.len() {
            return Progress {
                pct: 100.0,
                remaining_m: 0.0,
            };
        }

        let remaining_legs: f64 = self
            .segments
            .iter()
            .skip(target_index)
            .map(|s| s.distance_m)
            .sum();
        let remaining_m = distance_m + remaining_legs;

        if self.total_distance_m <= 0.0 {
            return Progress {
                pct: 100.0 * target_index as f64 / self.waypoints.len() as f64,
                remaining_m,
            };
        }

        let completed_m = match target_index {
            0 => 0.0,
            i => {
                let finished: f64 = self.segments[..i - 1].iter().map(|s| s.distance_m).sum();
                let leg = self.segments[i - 1].distance_m;
                finished + (leg - distance_m.min(leg)).max(0.0)
            }
        };

        Progress {
            pct: (100.0 * completed_m / self.total_distance_m).clamp(0.0, 100.0),
            remaining_m,
        }
    }

    /// Estimated time to complete the mission from `remaining_m` out.
    pub fn eta_s(&self, remaining_m: f64) -> f64 {
        remaining_m / self.params.speed_mps
    }
}
