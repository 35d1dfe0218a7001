//! Bounding boxes of GeoJSON documents.

use serde_json::Value;

use super::GeoBounds;

/// Computes the lon/lat bounding box of every coordinate in a GeoJSON value.
///
/// Accepts bare geometries, `Feature`, `FeatureCollection` and
/// `GeometryCollection`. A JSON string holding a GeoJSON document is parsed
/// first, since ingestion metadata often stores the extent serialized.
/// Returns `None` when the value holds no coordinates.
pub fn geojson_extent(value: &Value) -> Option<GeoBounds> {
    if let Value::String(text) = value {
        let parsed: Value = serde_json::from_str(text).ok()?;
        return geojson_extent(&parsed);
    }

    let mut bounds: Option<GeoBounds> = None;
    visit(value, &mut bounds);
    bounds
}

fn visit(value: &Value, bounds: &mut Option<GeoBounds>) {
    let Value::Object(map) = value else {
        return;
    };

    if let Some(coordinates) = map.get("coordinates") {
        collect_positions(coordinates, bounds);
    }
    if let Some(geometry) = map.get("geometry") {
        visit(geometry, bounds);
    }
    for key in ["features", "geometries"] {
        if let Some(Value::Array(items)) = map.get(key) {
            for item in items {
                visit(item, bounds);
            }
        }
    }
}

fn collect_positions(value: &Value, bounds: &mut Option<GeoBounds>) {
    let Value::Array(items) = value else {
        return;
    };

    // A position is an array whose first two members are numbers
    if let (Some(lon), Some(lat)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        match bounds {
            Some(b) => b.extend(lon, lat),
            None => {
                *bounds = Some(GeoBounds {
                    min_lon: lon,
                    min_lat: lat,
                    max_lon: lon,
                    max_lat: lat,
                })
            }
        }
        return;
    }

    for item in items {
        collect_positions(item, bounds);
    }
}
