//! Longitude rectification between the -180..180 and 0..360 conventions.
//!
//! Returned geometry is shifted into -180..180 (points only). Filter geometry
//! sent to the service is shifted into 0..360 (points and polygon rings).
//! Polygons are never rectified.

use geojson::Value as GeoValue;

use super::native::NativeGeometry;

/// Map a longitude above 180 into -180..180
pub fn rectify_longitude(x: f64) -> f64 {
    if x > 180.0 { x - 360.0 } else { x }
}

/// Map a negative longitude into 0..360
pub fn unrectify_longitude(x: f64) -> f64 {
    if x < 0.0 { x + 360.0 } else { x }
}

/// Rectify an interchange point in place; other kinds are left untouched
pub fn rectify(geometry: &mut geojson::Geometry) {
    if let GeoValue::Point(position) = &mut geometry.value
        && let Some(x) = position.first_mut()
    {
        *x = rectify_longitude(*x);
    }
}

/// Unrectify an interchange point or polygon in place
pub fn unrectify(geometry: &mut geojson::Geometry) {
    match &mut geometry.value {
        GeoValue::Point(position) => {
            if let Some(x) = position.first_mut() {
                *x = unrectify_longitude(*x);
            }
        }
        GeoValue::Polygon(rings) => {
            for position in rings.iter_mut().flatten() {
                if let Some(x) = position.first_mut() {
                    *x = unrectify_longitude(*x);
                }
            }
        }
        _ => {}
    }
}

/// Rectify a native point in place; polygons are left untouched
pub fn rectify_native(geometry: &mut NativeGeometry) {
    if let NativeGeometry::Point(point) = geometry {
        point.x = rectify_longitude(point.x);
    }
}
