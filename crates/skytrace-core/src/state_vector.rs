//! State-vector feed payloads and their normalization.
//!
//! The feed delivers each aircraft as a positional JSON array. That shape is
//! converted into [`StateVector`] right after parsing and never leaves this
//! module; everything downstream sees [`AircraftState`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{AircraftState, Position, Snapshot};

const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_TIME_POSITION: usize = 3;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_ON_GROUND: usize = 8;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_VERTICAL_RATE: usize = 11;
const IDX_GEO_ALTITUDE: usize = 13;
const IDX_SQUAWK: usize = 14;

/// Body of a state-vector response (live feed and fallback capture alike).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatesResponse {
    /// Feed time in seconds since the epoch.
    #[serde(default)]
    pub time: Option<f64>,
    /// The feed sends `null` when nothing is in the queried box.
    #[serde(default)]
    pub states: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum StateVectorError {
    #[error("state vector row has no transponder id")]
    MissingId,
}

/// Named view of one positional feed row.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    pub time_position: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    pub velocity: Option<f64>,
    pub true_track: Option<f64>,
    pub vertical_rate: Option<f64>,
    pub geo_altitude: Option<f64>,
    pub squawk: Option<String>,
}

impl StateVector {
    pub fn from_row(row: &[Value]) -> Result<Self, StateVectorError> {
        let icao24 = string_at(row, IDX_ICAO24)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(StateVectorError::MissingId)?;

        Ok(Self {
            icao24,
            callsign: string_at(row, IDX_CALLSIGN),
            origin_country: string_at(row, IDX_ORIGIN_COUNTRY),
            time_position: number_at(row, IDX_TIME_POSITION).map(|t| t as i64),
            longitude: number_at(row, IDX_LONGITUDE),
            latitude: number_at(row, IDX_LATITUDE),
            baro_altitude: number_at(row, IDX_BARO_ALTITUDE),
            on_ground: row
                .get(IDX_ON_GROUND)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            velocity: number_at(row, IDX_VELOCITY),
            true_track: number_at(row, IDX_TRUE_TRACK),
            vertical_rate: number_at(row, IDX_VERTICAL_RATE),
            geo_altitude: number_at(row, IDX_GEO_ALTITUDE),
            squawk: string_at(row, IDX_SQUAWK),
        })
    }

    /// Convert to an [`AircraftState`]; `None` for grounded aircraft or
    /// rows without a position.
    pub fn into_aircraft(self) -> Option<AircraftState> {
        if self.on_ground {
            return None;
        }
        let (lon, lat) = (self.longitude?, self.latitude?);
        let altitude_m = self.baro_altitude.or(self.geo_altitude).unwrap_or(0.0);

        let mut state = AircraftState::new(
            self.icao24,
            Position::new(lon, lat, altitude_m),
            self.true_track.unwrap_or(0.0),
            self.velocity.unwrap_or(0.0),
            self.vertical_rate.unwrap_or(0.0),
        )
        .with_callsign(self.callsign)
        .with_origin_country(self.origin_country);
        state.squawk = self.squawk;
        state.position_time = self
            .time_position
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        Some(state)
    }
}

/// Normalize a feed body into a [`Snapshot`] of airborne aircraft.
///
/// The snapshot time is the feed's `time` when present, otherwise now.
pub fn normalize_states(response: &StatesResponse) -> Snapshot {
    let timestamp = response
        .time
        .and_then(epoch_to_datetime)
        .unwrap_or_else(Utc::now);

    let aircraft = response
        .states
        .iter()
        .flatten()
        .filter_map(|row| StateVector::from_row(row).ok())
        .filter_map(StateVector::into_aircraft)
        .collect();

    Snapshot::new(timestamp, aircraft)
}

fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(whole, nanos)
}

fn number_at(row: &[Value], idx: usize) -> Option<f64> {
    let value = row.get(idx)?;
    if let Some(num) = value.as_f64() {
        return Some(num);
    }
    value.as_str().and_then(|text| text.trim().parse::<f64>().ok())
}

fn string_at(row: &[Value], idx: usize) -> Option<String> {
    row.get(idx).and_then(Value::as_str).map(str::to_string)
}
