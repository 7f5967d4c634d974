//! Skytrace core - flight state model and tracking algorithms.
//!
//! Everything in this crate is synchronous and free of I/O: the feed crate
//! produces [`StatesResponse`] values, and the tracker crate drives
//! [`extrapolate`] and the [`TrajectoryStore`] once per tick.

pub mod extrapolate;
pub mod geojson;
pub mod models;
pub mod state_vector;
pub mod trajectory;

pub use extrapolate::{extrapolate, project, EARTH_RADIUS_M};
pub use models::{
    AircraftState, FlightPath, GeoPoint, PathCollection, Position, Snapshot, TrackPoint,
    METERS_TO_FEET, MPS_TO_KNOTS,
};
pub use state_vector::{normalize_states, StateVector, StateVectorError, StatesResponse};
pub use trajectory::{TrajectoryStore, MAX_TRACK_POINTS};
