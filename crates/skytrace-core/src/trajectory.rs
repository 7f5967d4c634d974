//! Per-aircraft rolling position history used for trail rendering.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::models::{FlightPath, PathCollection, Position, TrackPoint};

/// Maximum number of points kept per aircraft.
pub const MAX_TRACK_POINTS: usize = 30;

/// Ordered history of recent positions, keyed by aircraft id.
///
/// Aircraft are kept in first-seen order. Histories survive an aircraft
/// dropping out of a batch and are only removed by [`TrajectoryStore::clear`].
#[derive(Debug, Clone)]
pub struct TrajectoryStore {
    max_points: usize,
    order: Vec<String>,
    tracks: HashMap<String, VecDeque<TrackPoint>>,
}

impl Default for TrajectoryStore {
    fn default() -> Self {
        Self::new(MAX_TRACK_POINTS)
    }
}

impl TrajectoryStore {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(1),
            order: Vec::new(),
            tracks: HashMap::new(),
        }
    }

    /// Append a point to the aircraft's history.
    ///
    /// Returns `false` when the point was dropped because its lon/lat equals
    /// the last stored point. The oldest point is evicted once the cap is hit.
    pub fn record(&mut self, id: &str, position: Position, timestamp: DateTime<Utc>) -> bool {
        if !self.tracks.contains_key(id) {
            self.order.push(id.to_string());
        }
        let max_points = self.max_points;
        let track = self
            .tracks
            .entry(id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(max_points));

        if let Some(last) = track.back() {
            if last.lon == position.lon && last.lat == position.lat {
                return false;
            }
        }

        if track.len() >= self.max_points {
            track.pop_front();
        }
        track.push_back(TrackPoint {
            lon: position.lon,
            lat: position.lat,
            altitude_m: position.altitude_m,
            timestamp,
        });
        true
    }

    /// Trails for every aircraft with at least two points, in first-seen order.
    pub fn as_path_collection(&self) -> PathCollection {
        let paths = self
            .order
            .iter()
            .filter_map(|id| {
                let track = self.tracks.get(id)?;
                if track.len() < 2 {
                    return None;
                }
                Some(FlightPath {
                    id: id.clone(),
                    points: track.iter().copied().collect(),
                })
            })
            .collect();
        PathCollection { paths }
    }

    pub fn track(&self, id: &str) -> Option<&VecDeque<TrackPoint>> {
        self.tracks.get(id)
    }

    /// Number of aircraft with any recorded history.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.tracks.clear();
    }
}
