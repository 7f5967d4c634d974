//! Text and GeoJSON renderings used by the CLI.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use skytrace_core::{normalize_states, PathCollection, Snapshot, StatesResponse};

/// One line per published snapshot: time, fleet size, trail count and the
/// first few aircraft.
pub fn summary_line(snapshot: &Snapshot, paths: &PathCollection) -> String {
    const SHOWN: usize = 3;

    let mut line = format!(
        "{} aircraft={} trails={}",
        snapshot.timestamp.format("%H:%M:%S%.3f"),
        snapshot.len(),
        paths.len()
    );
    for aircraft in snapshot.aircraft.iter().take(SHOWN) {
        line.push_str(&format!(
            " | {} {:.4},{:.4} {}ft {}kt",
            aircraft.label(),
            aircraft.position.lon,
            aircraft.position.lat,
            aircraft.altitude_ft,
            aircraft.velocity_knots
        ));
    }
    if snapshot.len() > SHOWN {
        line.push_str(&format!(" | +{} more", snapshot.len() - SHOWN));
    }
    line
}

/// Read a raw states capture and return its airborne aircraft as GeoJSON.
pub fn normalize_file(path: &Path) -> Result<Value> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let response: StatesResponse = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {} as a states response", path.display()))?;
    Ok(normalize_states(&response).to_geojson())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skytrace_core::{AircraftState, Position};

    fn aircraft(id: &str, callsign: &str) -> AircraftState {
        AircraftState::new(id, Position::new(34.7818, 32.0853, 1000.0), 90.0, 100.0, 0.0)
            .with_callsign(Some(callsign.to_string()))
    }

    #[test]
    fn test_summary_line_lists_first_aircraft() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::new(
            timestamp,
            vec![
                aircraft("a", "ELY001"),
                aircraft("b", "ELY002"),
                aircraft("c", "ELY003"),
                aircraft("d", "ELY004"),
            ],
        );

        let line = summary_line(&snapshot, &PathCollection::default());
        assert!(line.starts_with("12:00:00.000 aircraft=4 trails=0"));
        assert!(line.contains("ELY001 34.7818,32.0853 3281ft 194kt"));
        assert!(!line.contains("ELY004"));
        assert!(line.ends_with("+1 more"));
    }

    #[test]
    fn test_normalize_file_skips_grounded_rows() {
        let path = std::env::temp_dir().join(format!("skytrace-normalize-{}.json", std::process::id()));
        let body = serde_json::json!({
            "time": 1714564800,
            "states": [
                ["4x1234", "ELY001  ", "Israel", 1714564790, 1714564800, 34.78, 32.08, 3000.0, false, 150.0, 45.0, 0.0, null, 3050.0, "1200"],
                ["4x9999", "GRND1", "Israel", 1714564790, 1714564800, 34.88, 32.00, null, true, 0.0, 0.0, 0.0, null, null, null]
            ]
        });
        std::fs::write(&path, body.to_string()).unwrap();

        let geojson = normalize_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let features = geojson["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["callsign"], "ELY001");
    }

    #[test]
    fn test_normalize_file_reports_missing_file() {
        let err = normalize_file(Path::new("/nonexistent/skytrace.json")).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
