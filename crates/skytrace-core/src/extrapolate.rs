//! Dead-reckoning extrapolation of aircraft positions.

use chrono::TimeDelta;

use crate::models::{Position, Snapshot};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Advance `position` along `heading_deg` (clockwise from north) at
/// `velocity_mps` for `dt_secs` seconds. Altitude is held constant.
pub fn project(position: Position, heading_deg: f64, velocity_mps: f64, dt_secs: f64) -> Position {
    let distance_m = velocity_mps * dt_secs;
    if distance_m == 0.0 || !distance_m.is_finite() {
        return position;
    }

    let heading_rad = heading_deg.to_radians();
    let north_m = distance_m * heading_rad.cos();
    let east_m = distance_m * heading_rad.sin();

    let dlat = (north_m / EARTH_RADIUS_M).to_degrees();
    // Meridians converge away from the equator; clamp so the poles stay finite.
    let cos_lat = position.lat.to_radians().cos().abs().max(0.01);
    let dlon = (east_m / (EARTH_RADIUS_M * cos_lat)).to_degrees();

    Position {
        lon: wrap_longitude(position.lon + dlon),
        lat: (position.lat + dlat).clamp(-90.0, 90.0),
        altitude_m: position.altitude_m,
    }
}

/// Project every aircraft in `snapshot` forward by `dt_secs` seconds.
///
/// A non-positive or non-finite `dt_secs`, or one that would push the
/// timestamp out of range, returns the snapshot unchanged.
pub fn extrapolate(snapshot: &Snapshot, dt_secs: f64) -> Snapshot {
    if !dt_secs.is_finite() || dt_secs <= 0.0 {
        return snapshot.clone();
    }
    let Some(timestamp) = TimeDelta::try_milliseconds((dt_secs * 1000.0).round() as i64)
        .and_then(|elapsed| snapshot.timestamp.checked_add_signed(elapsed))
    else {
        return snapshot.clone();
    };

    let aircraft = snapshot
        .aircraft
        .iter()
        .map(|state| {
            state.moved_to(project(
                state.position,
                state.heading_deg,
                state.velocity_mps,
                dt_secs,
            ))
        })
        .collect();

    Snapshot::new(timestamp, aircraft)
}

fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AircraftState;
    use chrono::{TimeZone, Utc};

    fn snapshot_with(heading_deg: f64, velocity_mps: f64, lat: f64) -> Snapshot {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Snapshot::new(
            ts,
            vec![AircraftState::new(
                "abc123",
                Position::new(34.78, lat, 9000.0),
                heading_deg,
                velocity_mps,
                5.0,
            )],
        )
    }

    #[test]
    fn non_positive_dt_is_a_no_op() {
        let snapshot = snapshot_with(45.0, 200.0, 32.08);
        assert_eq!(extrapolate(&snapshot, 0.0), snapshot);
        assert_eq!(extrapolate(&snapshot, -3.0), snapshot);
        assert_eq!(extrapolate(&snapshot, f64::NAN), snapshot);
    }

    #[test]
    fn out_of_range_dt_is_a_no_op() {
        let snapshot = snapshot_with(45.0, 200.0, 32.08);
        assert_eq!(extrapolate(&snapshot, 1e13), snapshot);
        assert_eq!(extrapolate(&snapshot, f64::MAX), snapshot);
    }

    #[test]
    fn due_north_moves_latitude_only() {
        let v = 250.0;
        let dt = 10.0;
        let snapshot = snapshot_with(0.0, v, 32.08);
        let next = extrapolate(&snapshot, dt);

        let before = snapshot.aircraft[0].position;
        let after = next.aircraft[0].position;
        let expected_dlat = (v * dt / EARTH_RADIUS_M) * (180.0 / std::f64::consts::PI);

        assert!((after.lat - before.lat - expected_dlat).abs() < 1e-9);
        assert!((after.lon - before.lon).abs() < 1e-9);
        assert_eq!(after.altitude_m, before.altitude_m);
        assert_eq!((next.timestamp - snapshot.timestamp).num_milliseconds(), 10_000);
    }

    #[test]
    fn due_east_is_scaled_by_latitude() {
        let at_equator = extrapolate(&snapshot_with(90.0, 100.0, 0.0), 60.0);
        let at_sixty = extrapolate(&snapshot_with(90.0, 100.0, 60.0), 60.0);

        let dlon_equator = at_equator.aircraft[0].position.lon - 34.78;
        let dlon_sixty = at_sixty.aircraft[0].position.lon - 34.78;

        assert!(dlon_equator > 0.0);
        assert!((dlon_sixty / dlon_equator - 2.0).abs() < 1e-6);
        assert!((at_equator.aircraft[0].position.lat).abs() < 1e-9);
    }

    #[test]
    fn longitude_wraps_at_antimeridian() {
        let position = project(Position::new(179.999, 0.0, 0.0), 90.0, 300.0, 60.0);
        assert!(position.lon < -179.0);
    }
}
