//! Read operations: query, count, autocomplete, single features, related records.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{FEATURE_SERVER, MAP_SERVER, ServiceClient};
use crate::edits::FeatureClassId;
use crate::error::{ClientError, ClientResult};
use crate::geometry::{GeometryCodec, GeometryType, SpatialReference};
use crate::params::QueryParams;

/// A returned feature: its attributes plus converted geometry under the
/// shape attribute
pub type FeatureRecord = Map<String, Value>;

/// Always-true predicate used when no where clause is given
const MATCH_ALL: &str = "1=1";

/// Options of a feature class query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// SQL where clause, `1=1` when absent or empty
    pub where_clause: Option<String>,
    /// GeoJSON Feature or Geometry restricting the result spatially
    pub filter_geometry: Option<Value>,
    /// `orderByFields` value, e.g. `NAME DESC`
    pub order_by: Option<String>,
}

impl QueryOptions {
    /// Match everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the where clause
    #[must_use]
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Set the filter geometry
    #[must_use]
    pub fn with_filter_geometry(mut self, geometry: Value) -> Self {
        self.filter_geometry = Some(geometry);
        self
    }

    /// Set the ordering
    #[must_use]
    pub fn with_order_by(mut self, fields: impl Into<String>) -> Self {
        self.order_by = Some(fields.into());
        self
    }
}

impl ServiceClient {
    /// Query a feature class and return flat records
    ///
    /// # Errors
    ///
    /// Transport and service errors, unconvertible filter geometry, or
    /// [`ClientError::MalformedResponse`] when the answer has no `features`.
    pub async fn query(
        &self,
        feature_class: &FeatureClassId,
        options: &QueryOptions,
    ) -> ClientResult<Vec<FeatureRecord>> {
        let params = self.query_params(options)?;
        let response = self
            .request(&[MAP_SERVER, feature_class.as_str(), "query"], params)
            .await?;

        let records = extract_query_records(&self.codec, &self.config.shape_attribute, &response)?;
        debug!(feature_class = %feature_class, records = records.len(), "Query complete");
        Ok(records)
    }

    /// Number of features matching `options`
    ///
    /// The filter geometry, when given, is sent.
    ///
    /// # Errors
    ///
    /// Transport and service errors, or [`ClientError::MalformedResponse`]
    /// when the answer has no `count`.
    pub async fn count(
        &self,
        feature_class: &FeatureClassId,
        options: &QueryOptions,
    ) -> ClientResult<u64> {
        let mut params = self.query_params(options)?;
        params.remove("orderByFields");
        params.insert("returnCountOnly".to_string(), Value::Bool(true));

        let response = self
            .request(&[MAP_SERVER, feature_class.as_str(), "query"], params)
            .await?;
        response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::MalformedResponse("count response has no count".to_string()))
    }

    /// Distinct values of `field` starting with `stub`
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidInput`] for a field name that is not a plain
    /// identifier, plus transport and service errors.
    pub async fn autocomplete(
        &self,
        feature_class: &FeatureClassId,
        field: &str,
        stub: &str,
    ) -> ClientResult<Vec<Value>> {
        if field.is_empty()
            || !field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(ClientError::InvalidInput(format!("not a field name: {field:?}")));
        }

        let mut params = QueryParams::new();
        params.insert(
            "where".to_string(),
            Value::from(format!("{field} LIKE '{}%'", stub.replace('\'', "''"))),
        );
        params.insert("outFields".to_string(), Value::from(field));
        params.insert("returnDistinctValues".to_string(), Value::Bool(true));
        params.insert("returnGeometry".to_string(), Value::Bool(false));

        let response = self
            .request(&[MAP_SERVER, feature_class.as_str(), "query"], params)
            .await?;
        let features = features_of(&response)?;

        Ok(features
            .iter()
            .filter_map(|f| f.get("attributes").and_then(|a| a.get(field)).cloned())
            .collect())
    }

    /// One feature by object id, `None` when the service returns no feature
    ///
    /// Authenticated reads go to the feature server, anonymous reads to the
    /// map server.
    ///
    /// # Errors
    ///
    /// Transport and service errors.
    pub async fn feature_details(
        &self,
        feature_class: &FeatureClassId,
        feature_id: i64,
    ) -> ClientResult<Option<FeatureRecord>> {
        let params = self.base_params().await?;
        let capability = if params.contains_key("token") {
            FEATURE_SERVER
        } else {
            MAP_SERVER
        };
        let feature_id = feature_id.to_string();

        let response = self
            .dispatch(&[capability, feature_class.as_str(), feature_id.as_str()], &params)
            .await?;

        let metadata = self.metadata.cached_feature_class(feature_class);
        let geometry_type = metadata.as_ref().and_then(|m| m.geometry_type());
        let spatial_reference = metadata.as_ref().and_then(|m| m.spatial_reference());

        Ok(response
            .get("feature")
            .filter(|f| !f.is_null())
            .map(|feature| {
                feature_record(
                    &self.codec,
                    &self.config.shape_attribute,
                    feature,
                    geometry_type,
                    spatial_reference.as_ref(),
                )
            }))
    }

    /// Records related to a feature through relationship `relationship_id`
    ///
    /// # Errors
    ///
    /// Transport and service errors.
    pub async fn related_records(
        &self,
        relationship_id: i64,
        feature_class: &FeatureClassId,
        feature_id: i64,
    ) -> ClientResult<Value> {
        let mut params = QueryParams::new();
        params.insert("objectIds".to_string(), Value::from(feature_id.to_string()));
        params.insert("relationshipId".to_string(), Value::from(relationship_id));
        params.insert("returnGeometry".to_string(), Value::from("true"));
        params.insert("outFields".to_string(), Value::from("*"));

        self.request(
            &[MAP_SERVER, feature_class.as_str(), "queryRelatedRecords"],
            params,
        )
        .await
    }

    fn query_params(&self, options: &QueryOptions) -> ClientResult<QueryParams> {
        let mut params = QueryParams::new();

        let where_clause = options
            .where_clause
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .unwrap_or(MATCH_ALL);
        params.insert("where".to_string(), Value::from(where_clause));
        params.insert("outFields".to_string(), Value::from("*"));

        if let Some(filter) = &options.filter_geometry {
            let (geometry, geometry_type) = self.codec.filter_geometry(
                filter,
                &self.config.id_attribute,
                self.config.unrectify_filter_geometry,
            )?;
            params.insert(
                "geometry".to_string(),
                serde_json::to_value(geometry).map_err(|e| ClientError::InvalidInput(e.to_string()))?,
            );
            params.insert(
                "geometryType".to_string(),
                Value::from(geometry_type.as_str()),
            );
        }

        if let Some(order_by) = &options.order_by {
            params.insert("orderByFields".to_string(), Value::from(order_by.as_str()));
        }

        Ok(params)
    }
}

fn features_of(response: &Value) -> ClientResult<&Vec<Value>> {
    response
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::MalformedResponse("query response has no features".to_string()))
}

/// Flatten a query response into records, converting each geometry
pub(crate) fn extract_query_records(
    codec: &GeometryCodec,
    shape_attribute: &str,
    response: &Value,
) -> ClientResult<Vec<FeatureRecord>> {
    let features = features_of(response)?;
    let geometry_type = response
        .get("geometryType")
        .and_then(|t| GeometryType::deserialize(t).ok());
    let spatial_reference = response
        .get("spatialReference")
        .and_then(|sr| SpatialReference::deserialize(sr).ok());

    Ok(features
        .iter()
        .map(|feature| {
            feature_record(
                codec,
                shape_attribute,
                feature,
                geometry_type,
                spatial_reference.as_ref(),
            )
        })
        .collect())
}

/// `{attributes, geometry}` to a flat record
///
/// Geometry that cannot be converted is logged and returned as null.
fn feature_record(
    codec: &GeometryCodec,
    shape_attribute: &str,
    feature: &Value,
    geometry_type: Option<GeometryType>,
    spatial_reference: Option<&SpatialReference>,
) -> FeatureRecord {
    let mut record = feature
        .get("attributes")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    match feature.get("geometry") {
        None => {}
        Some(Value::Null) => {
            record.insert(shape_attribute.to_string(), Value::Null);
        }
        Some(geometry) => {
            let shape = codec
                .decode_returned(geometry, geometry_type, spatial_reference)
                .map_err(|e| e.to_string())
                .and_then(|g| serde_json::to_value(g).map_err(|e| e.to_string()))
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Returned geometry could not be converted");
                    Value::Null
                });
            record.insert(shape_attribute.to_string(), shape);
        }
    }

    record
}
