//! Core data models for the flight tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Meters to feet.
pub const METERS_TO_FEET: f64 = 3.28084;
/// Meters per second to knots.
pub const MPS_TO_KNOTS: f64 = 1.94384;

/// A bare longitude/latitude pair, used for the query center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when either axis moved by more than `threshold_deg`.
    pub fn moved_beyond(&self, other: &GeoPoint, threshold_deg: f64) -> bool {
        (self.lon - other.lon).abs() > threshold_deg || (self.lat - other.lat).abs() > threshold_deg
    }
}

/// 3D position of an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub altitude_m: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64, altitude_m: f64) -> Self {
        Self {
            lon,
            lat,
            altitude_m,
        }
    }
}

/// One tracked aircraft at a point in time.
///
/// Instances are rebuilt every tick rather than updated in place; the
/// display fields (`altitude_ft`, `velocity_knots`) are derived once when
/// the state is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    /// Transponder address (ICAO 24-bit, hex).
    pub id: String,
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    #[serde(default)]
    pub squawk: Option<String>,
    pub position: Position,
    /// Degrees clockwise from north.
    pub heading_deg: f64,
    pub velocity_mps: f64,
    pub vertical_rate_mps: f64,
    pub altitude_ft: i64,
    pub velocity_knots: i64,
    #[serde(default)]
    pub position_time: Option<DateTime<Utc>>,
}

impl AircraftState {
    /// Create a state with only kinematic fields; descriptive fields are empty.
    pub fn new(
        id: impl Into<String>,
        position: Position,
        heading_deg: f64,
        velocity_mps: f64,
        vertical_rate_mps: f64,
    ) -> Self {
        Self {
            id: id.into(),
            callsign: None,
            origin_country: None,
            squawk: None,
            position,
            heading_deg,
            velocity_mps,
            vertical_rate_mps,
            altitude_ft: (position.altitude_m * METERS_TO_FEET).round() as i64,
            velocity_knots: (velocity_mps * MPS_TO_KNOTS).round() as i64,
            position_time: None,
        }
    }

    pub fn with_callsign(mut self, callsign: Option<String>) -> Self {
        self.callsign = callsign
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn with_origin_country(mut self, country: Option<String>) -> Self {
        self.origin_country = country.filter(|value| !value.trim().is_empty());
        self
    }

    /// Display name: the callsign when known, otherwise the transponder id.
    pub fn label(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.id)
    }

    /// Copy of this state at a new position, derived fields recomputed.
    pub fn moved_to(&self, position: Position) -> Self {
        Self {
            position,
            altitude_ft: (position.altitude_m * METERS_TO_FEET).round() as i64,
            ..self.clone()
        }
    }
}

/// The world at one instant: every airborne aircraft plus the time it describes.
///
/// Published snapshots are shared behind `Arc` and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub aircraft: Vec<AircraftState>,
}

impl Snapshot {
    pub fn new(timestamp: DateTime<Utc>, aircraft: Vec<AircraftState>) -> Self {
        Self {
            timestamp,
            aircraft,
        }
    }

    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn get(&self, id: &str) -> Option<&AircraftState> {
        self.aircraft.iter().find(|a| a.id == id)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// One recorded trail point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lon: f64,
    pub lat: f64,
    pub altitude_m: f64,
    pub timestamp: DateTime<Utc>,
}

/// Trail of a single aircraft, oldest point first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPath {
    pub id: String,
    pub points: Vec<TrackPoint>,
}

/// All renderable trails (aircraft with at least two points).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathCollection {
    pub paths: Vec<FlightPath>,
}

impl PathCollection {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn get(&self, id: &str) -> Option<&FlightPath> {
        self.paths.iter().find(|p| p.id == id)
    }
}
