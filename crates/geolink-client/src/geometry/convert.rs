//! Structural conversion between GeoJSON and native geometry.

use geojson::Value as GeoValue;

use super::native::{GeometryType, NativeGeometry, NativePoint, NativePolygon, SpatialReference};
use crate::error::{GeometryError, GeometryResult};

/// Bidirectional geometry conversion contract
///
/// Implementations convert shapes only. Longitude rectification and spatial
/// reference stripping are applied by [`GeometryCodec`](super::GeometryCodec).
pub trait GeometryConverter: Send + Sync + std::fmt::Debug {
    /// Convert interchange geometry to its native form
    fn to_native(&self, geometry: &geojson::Geometry) -> GeometryResult<NativeGeometry>;

    /// Convert native geometry to interchange form
    ///
    /// `geometry_type` and `spatial_reference` are the sibling fields of a
    /// query response, when known.
    fn to_interchange(
        &self,
        native: &NativeGeometry,
        geometry_type: Option<GeometryType>,
        spatial_reference: Option<&SpatialReference>,
    ) -> GeometryResult<geojson::Geometry>;
}

/// Built-in converter for points, polygons and multipolygons
///
/// Coordinates are copied as-is; no reprojection is performed. Native
/// geometry produced here is tagged WGS 84.
#[derive(Debug, Default, Clone, Copy)]
pub struct EsriJsonConverter;

impl GeometryConverter for EsriJsonConverter {
    fn to_native(&self, geometry: &geojson::Geometry) -> GeometryResult<NativeGeometry> {
        match &geometry.value {
            GeoValue::Point(position) => {
                let (x, y) = xy(position)?;
                Ok(NativeGeometry::Point(NativePoint {
                    x,
                    y,
                    spatial_reference: Some(SpatialReference::wgs84()),
                }))
            }
            GeoValue::Polygon(rings) => Ok(NativeGeometry::Polygon(NativePolygon {
                rings: native_rings(rings)?,
                spatial_reference: Some(SpatialReference::wgs84()),
            })),
            GeoValue::MultiPolygon(polygons) => {
                let mut rings = Vec::new();
                for polygon in polygons {
                    rings.extend(native_rings(polygon)?);
                }
                Ok(NativeGeometry::Polygon(NativePolygon {
                    rings,
                    spatial_reference: Some(SpatialReference::wgs84()),
                }))
            }
            other => Err(GeometryError::Unsupported(
                super::interchange_type_name(other).to_string(),
            )),
        }
    }

    fn to_interchange(
        &self,
        native: &NativeGeometry,
        geometry_type: Option<GeometryType>,
        _spatial_reference: Option<&SpatialReference>,
    ) -> GeometryResult<geojson::Geometry> {
        if let Some(expected) = geometry_type
            && expected != native.geometry_type()
        {
            return Err(GeometryError::Invalid(format!(
                "response declares {expected} but geometry is {}",
                native.geometry_type()
            )));
        }

        let value = match native {
            NativeGeometry::Point(point) => GeoValue::Point(vec![point.x, point.y]),
            NativeGeometry::Polygon(polygon) => interchange_polygon(&polygon.rings)?,
        };
        Ok(geojson::Geometry::new(value))
    }
}

fn xy(position: &[f64]) -> GeometryResult<(f64, f64)> {
    match position {
        [x, y, ..] => Ok((*x, *y)),
        _ => Err(GeometryError::Invalid(
            "position needs at least two coordinates".to_string(),
        )),
    }
}

/// Signed-area test; true when the ring runs clockwise in a y-up plane
fn is_clockwise(ring: &[Vec<f64>]) -> bool {
    let sum: f64 = ring
        .windows(2)
        .filter_map(|pair| match (pair[0].as_slice(), pair[1].as_slice()) {
            ([x1, y1, ..], [x2, y2, ..]) => Some((x2 - x1) * (y2 + y1)),
            _ => None,
        })
        .sum();
    sum > 0.0
}

fn closed(ring: &[Vec<f64>]) -> GeometryResult<Vec<Vec<f64>>> {
    if ring.len() < 3 {
        return Err(GeometryError::Invalid(format!(
            "ring has {} positions, need at least 3",
            ring.len()
        )));
    }
    for position in ring {
        xy(position)?;
    }
    let mut ring = ring.to_vec();
    if ring.first() != ring.last()
        && let Some(first) = ring.first().cloned()
    {
        ring.push(first);
    }
    Ok(ring)
}

/// GeoJSON polygon rings (outer first) to native winding
fn native_rings(rings: &[Vec<Vec<f64>>]) -> GeometryResult<Vec<Vec<Vec<f64>>>> {
    rings
        .iter()
        .enumerate()
        .map(|(index, ring)| {
            let mut ring = closed(ring)?;
            let outer = index == 0;
            if is_clockwise(&ring) != outer {
                ring.reverse();
            }
            Ok(ring)
        })
        .collect()
}

/// Native rings to a GeoJSON polygon or multipolygon
///
/// Each clockwise ring starts a new polygon; counter-clockwise rings are holes
/// of the polygon before them.
fn interchange_polygon(rings: &[Vec<Vec<f64>>]) -> GeometryResult<GeoValue> {
    let mut polygons: Vec<Vec<Vec<Vec<f64>>>> = Vec::new();

    for ring in rings {
        let mut ring = closed(ring)?;
        let clockwise = is_clockwise(&ring);
        ring.reverse();

        match polygons.last_mut() {
            Some(polygon) if !clockwise => polygon.push(ring),
            _ => polygons.push(vec![ring]),
        }
    }

    match polygons.len() {
        0 => Err(GeometryError::Invalid("polygon has no rings".to_string())),
        1 => Ok(GeoValue::Polygon(polygons.remove(0))),
        _ => Ok(GeoValue::MultiPolygon(polygons)),
    }
}
