//! Structural checks for GeoJSON geometry objects.

use serde_json::Value as Json;

/// Geometry `type` member of a GeoJSON object.
pub fn geometry_type(geometry: &Json) -> Option<&str> {
    geometry.get("type").and_then(Json::as_str)
}

/// Check that `geometry` is a GeoJSON geometry with numeric positions.
///
/// Returns the reason it is not, suitable for a validation message.
pub fn check_geometry(geometry: &Json) -> Result<(), String> {
    let Some(kind) = geometry_type(geometry) else {
        return Err("a GeoJSON geometry needs a string \"type\" member".to_string());
    };
    if kind == "GeometryCollection" {
        let Some(members) = geometry.get("geometries").and_then(Json::as_array) else {
            return Err("a GeometryCollection needs a \"geometries\" array".to_string());
        };
        return members.iter().try_for_each(check_geometry);
    }

    let Some(coordinates) = geometry.get("coordinates") else {
        return Err(format!("a {kind} needs a \"coordinates\" member"));
    };
    let depth = match kind {
        "Point" => 0,
        "LineString" | "MultiPoint" => 1,
        "Polygon" | "MultiLineString" => 2,
        "MultiPolygon" => 3,
        other => return Err(format!("unknown geometry type '{other}'")),
    };
    check_nested(coordinates, depth, kind)?;

    match kind {
        "LineString" => check_min_len(coordinates, 2, kind),
        "Polygon" => rings(coordinates).try_for_each(|ring| check_ring(ring, kind)),
        "MultiLineString" => lists(coordinates).try_for_each(|line| check_min_len(line, 2, kind)),
        "MultiPolygon" => lists(coordinates)
            .flat_map(rings)
            .try_for_each(|ring| check_ring(ring, kind)),
        _ => Ok(()),
    }
}

fn lists(json: &Json) -> impl Iterator<Item = &Json> {
    json.as_array().into_iter().flatten()
}

fn rings(polygon: &Json) -> impl Iterator<Item = &Json> {
    lists(polygon)
}

fn check_position(position: &Json, kind: &str) -> Result<(), String> {
    match position.as_array() {
        Some(values) if values.len() >= 2 && values.iter().all(Json::is_number) => Ok(()),
        _ => Err(format!(
            "{kind} positions must be arrays of at least two numbers, got {position}"
        )),
    }
}

fn check_nested(coordinates: &Json, depth: usize, kind: &str) -> Result<(), String> {
    if depth == 0 {
        return check_position(coordinates, kind);
    }
    let Some(items) = coordinates.as_array() else {
        return Err(format!("{kind} coordinates must be nested arrays"));
    };
    items
        .iter()
        .try_for_each(|item| check_nested(item, depth - 1, kind))
}

fn check_min_len(list: &Json, min: usize, kind: &str) -> Result<(), String> {
    let len = list.as_array().map_or(0, Vec::len);
    if len < min {
        return Err(format!("a {kind} needs at least {min} positions"));
    }
    Ok(())
}

fn check_ring(ring: &Json, kind: &str) -> Result<(), String> {
    check_min_len(ring, 4, kind)?;
    let positions = ring.as_array().map(Vec::as_slice).unwrap_or_default();
    if positions.first() != positions.last() {
        return Err(format!("{kind} rings must be closed"));
    }
    Ok(())
}
