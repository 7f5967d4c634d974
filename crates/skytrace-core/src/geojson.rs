//! GeoJSON rendering of snapshots and trails for map renderers.

use serde_json::{json, Value};

use crate::models::{PathCollection, Snapshot};

impl Snapshot {
    /// FeatureCollection with one Point feature per aircraft.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .aircraft
            .iter()
            .map(|a| {
                json!({
                    "type": "Feature",
                    "id": a.id,
                    "geometry": {
                        "type": "Point",
                        "coordinates": [a.position.lon, a.position.lat, a.position.altitude_m],
                    },
                    "properties": {
                        "id": a.id,
                        "callsign": a.label(),
                        "origin_country": a.origin_country,
                        "squawk": a.squawk,
                        "altitude_m": a.position.altitude_m,
                        "altitude_ft": a.altitude_ft,
                        "velocity_mps": a.velocity_mps,
                        "velocity_knots": a.velocity_knots,
                        "heading": a.heading_deg,
                        "vertical_rate": a.vertical_rate_mps,
                    }
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "timestamp": self.timestamp.to_rfc3339(),
            "features": features,
        })
    }
}

impl PathCollection {
    /// FeatureCollection with one LineString feature per trail.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .paths
            .iter()
            .map(|path| {
                let coordinates: Vec<[f64; 3]> = path
                    .points
                    .iter()
                    .map(|p| [p.lon, p.lat, p.altitude_m])
                    .collect();
                json!({
                    "type": "Feature",
                    "id": path.id,
                    "geometry": {
                        "type": "LineString",
                        "coordinates": coordinates,
                    },
                    "properties": {
                        "id": path.id,
                        "points": path.points.len(),
                    }
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}
