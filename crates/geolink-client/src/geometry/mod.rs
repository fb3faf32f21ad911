//! Geometry codec: GeoJSON on the caller side, native geometry on the wire.
//!
//! Structural conversion is delegated to a [`GeometryConverter`]; this module
//! adds the pieces the service needs around it (rectification, spatial
//! reference stripping, feature unwrapping).

mod convert;
mod native;
mod rectify;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{GeometryError, GeometryResult};

pub use convert::{EsriJsonConverter, GeometryConverter};
pub use native::{GeometryType, NativeGeometry, NativePoint, NativePolygon, SpatialReference};
pub use rectify::{rectify, rectify_longitude, rectify_native, unrectify, unrectify_longitude};

/// A GeoJSON feature converted to native `{geometry, attributes}` form
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NativeFeature {
    /// Converted geometry, absent for geometry-less features
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<NativeGeometry>,
    /// Feature properties plus the feature id under the id attribute
    pub attributes: Map<String, Value>,
}

/// Converts geometry in both directions around a pluggable converter
#[derive(Debug, Clone)]
pub struct GeometryCodec {
    converter: Arc<dyn GeometryConverter>,
}

impl Default for GeometryCodec {
    fn default() -> Self {
        Self::new(Arc::new(EsriJsonConverter))
    }
}

impl GeometryCodec {
    /// Create a codec over a converter
    pub fn new(converter: Arc<dyn GeometryConverter>) -> Self {
        Self { converter }
    }

    /// Interchange geometry to native geometry
    pub fn to_native(&self, geometry: &geojson::Geometry) -> GeometryResult<NativeGeometry> {
        self.converter.to_native(geometry)
    }

    /// GeoJSON feature to native `{geometry, attributes}`
    ///
    /// The feature id, when present, is stored under `id_attribute`.
    pub fn feature_to_native(
        &self,
        feature: &geojson::Feature,
        id_attribute: &str,
    ) -> GeometryResult<NativeFeature> {
        let geometry = feature
            .geometry
            .as_ref()
            .map(|g| self.to_native(g))
            .transpose()?;

        let mut attributes = feature.properties.clone().unwrap_or_default();
        match &feature.id {
            Some(geojson::feature::Id::Number(n)) => {
                attributes.insert(id_attribute.to_string(), Value::Number(n.clone()));
            }
            Some(geojson::feature::Id::String(s)) => {
                attributes.insert(id_attribute.to_string(), Value::String(s.clone()));
            }
            None => {}
        }

        Ok(NativeFeature {
            geometry,
            attributes,
        })
    }

    /// Native geometry to interchange geometry
    pub fn to_interchange(
        &self,
        native: &NativeGeometry,
        geometry_type: Option<GeometryType>,
        spatial_reference: Option<&SpatialReference>,
    ) -> GeometryResult<geojson::Geometry> {
        self.converter
            .to_interchange(native, geometry_type, spatial_reference)
    }

    /// Decode a native fragment from a response, convert it and rectify it
    pub fn decode_returned(
        &self,
        value: &Value,
        geometry_type: Option<GeometryType>,
        spatial_reference: Option<&SpatialReference>,
    ) -> GeometryResult<geojson::Geometry> {
        let native = NativeGeometry::from_value(value)?;
        let mut geometry = self.to_interchange(&native, geometry_type, spatial_reference)?;
        rectify(&mut geometry);
        Ok(geometry)
    }

    /// Convert query filter geometry (a GeoJSON Feature or bare Geometry)
    ///
    /// The result carries no spatial reference. With `unrectify_first`,
    /// negative longitudes are moved into 0..360 before conversion.
    pub fn filter_geometry(
        &self,
        value: &Value,
        id_attribute: &str,
        unrectify_first: bool,
    ) -> GeometryResult<(NativeGeometry, GeometryType)> {
        let mut geometry = interchange_geometry(value)?
            .ok_or_else(|| GeometryError::Invalid("filter feature has no geometry".to_string()))?;
        let geometry_type = GeometryType::of_interchange(&geometry.value)?;

        if unrectify_first {
            unrectify(&mut geometry);
        }

        let feature = geojson::Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        };
        let mut native = self
            .feature_to_native(&feature, id_attribute)?
            .geometry
            .ok_or_else(|| GeometryError::Invalid("filter feature has no geometry".to_string()))?;
        native.strip_spatial_reference();

        Ok((native, geometry_type))
    }

    /// Convert a geometry value headed for an edit payload, rectifying points
    pub fn submission_geometry(&self, value: &Value) -> GeometryResult<Option<NativeGeometry>> {
        let Some(geometry) = interchange_geometry(value)? else {
            return Ok(None);
        };
        let mut native = self.to_native(&geometry)?;
        rectify_native(&mut native);
        Ok(Some(native))
    }
}

/// Extract interchange geometry from a Feature or Geometry JSON value
fn interchange_geometry(value: &Value) -> GeometryResult<Option<geojson::Geometry>> {
    let invalid = |e: serde_json::Error| GeometryError::Invalid(e.to_string());
    match value.get("type").and_then(Value::as_str) {
        Some("Feature") => {
            let feature: geojson::Feature =
                serde_json::from_value(value.clone()).map_err(invalid)?;
            Ok(feature.geometry)
        }
        Some(_) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(invalid),
        None => Err(GeometryError::Invalid(
            "expected a GeoJSON Feature or Geometry".to_string(),
        )),
    }
}

pub(crate) fn interchange_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}
