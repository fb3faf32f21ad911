//! The service's native geometry encoding.

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, GeometryResult};

/// Spatial reference attached to native geometry or query responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    /// Well-known id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<i64>,
    /// Current well-known id when `wkid` is a legacy alias
    #[serde(
        rename = "latestWkid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub latest_wkid: Option<i64>,
}

impl SpatialReference {
    /// Geographic WGS 84 (EPSG:4326)
    pub const fn wgs84() -> Self {
        Self {
            wkid: Some(4326),
            latest_wkid: None,
        }
    }
}

/// Geometry type tag carried next to native geometry on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    /// Single point
    #[serde(rename = "esriGeometryPoint")]
    Point,
    /// Point collection
    #[serde(rename = "esriGeometryMultipoint")]
    Multipoint,
    /// Paths
    #[serde(rename = "esriGeometryPolyline")]
    Polyline,
    /// Rings
    #[serde(rename = "esriGeometryPolygon")]
    Polygon,
    /// Bounding box
    #[serde(rename = "esriGeometryEnvelope")]
    Envelope,
}

impl GeometryType {
    /// Wire name of the tag
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "esriGeometryPoint",
            Self::Multipoint => "esriGeometryMultipoint",
            Self::Polyline => "esriGeometryPolyline",
            Self::Polygon => "esriGeometryPolygon",
            Self::Envelope => "esriGeometryEnvelope",
        }
    }

    /// Tag for an interchange geometry, for the kinds this codec can send
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Unsupported`] for anything but points and polygons.
    pub fn of_interchange(value: &geojson::Value) -> GeometryResult<Self> {
        match value {
            geojson::Value::Point(_) => Ok(Self::Point),
            geojson::Value::Polygon(_) | geojson::Value::MultiPolygon(_) => Ok(Self::Polygon),
            other => Err(GeometryError::Unsupported(
                super::interchange_type_name(other).to_string(),
            )),
        }
    }
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A native point: `{"x", "y", "spatialReference"?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativePoint {
    /// Longitude or easting
    pub x: f64,
    /// Latitude or northing
    pub y: f64,
    /// Attached spatial reference
    #[serde(
        rename = "spatialReference",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

/// A native polygon: `{"rings", "spatialReference"?}`
///
/// Outer rings run clockwise, holes counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativePolygon {
    /// Closed rings of `[x, y, ...]` positions
    pub rings: Vec<Vec<Vec<f64>>>,
    /// Attached spatial reference
    #[serde(
        rename = "spatialReference",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub spatial_reference: Option<SpatialReference>,
}

/// Native geometry in the service's JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NativeGeometry {
    /// `{"x", "y"}`
    Point(NativePoint),
    /// `{"rings"}`
    Polygon(NativePolygon),
}

impl NativeGeometry {
    /// Decode native geometry from a response fragment
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Unsupported`] when the fragment is neither a
    /// point nor a polygon.
    pub fn from_value(value: &serde_json::Value) -> GeometryResult<Self> {
        Self::deserialize(value).map_err(|_| {
            let kind = if value.get("paths").is_some() {
                "polyline"
            } else if value.get("points").is_some() {
                "multipoint"
            } else if value.get("xmin").is_some() {
                "envelope"
            } else {
                "unknown"
            };
            GeometryError::Unsupported(kind.to_string())
        })
    }

    /// Type tag for this geometry
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::Polygon(_) => GeometryType::Polygon,
        }
    }

    /// Attached spatial reference, if any
    pub fn spatial_reference(&self) -> Option<&SpatialReference> {
        match self {
            Self::Point(p) => p.spatial_reference.as_ref(),
            Self::Polygon(p) => p.spatial_reference.as_ref(),
        }
    }

    /// Remove the attached spatial reference
    pub fn strip_spatial_reference(&mut self) {
        match self {
            Self::Point(p) => p.spatial_reference = None,
            Self::Polygon(p) => p.spatial_reference = None,
        }
    }
}
