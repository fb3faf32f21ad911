//! Edit operations through `FeatureServer/applyEdits`.

use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{FEATURE_SERVER, ServiceClient};
use crate::edits::{
    EditBatch, EditResultBlock, FeatureClassId, UpdateOutcome, check_delete_success,
    check_insert_success, check_update_success, not_all_blank, parse_edit_results, update_outcome,
};
use crate::error::{ClientError, ClientResult};
use crate::geometry::GeometryCodec;
use crate::metadata::{FeatureClassMetadata, FieldInfo};
use crate::params::QueryParams;

/// Build a `{geometry, attributes}` edit payload from caller data
///
/// The geometry field's value (GeoJSON Feature or Geometry) is converted to
/// native form with points rectified. Every other schema field is copied into
/// `attributes`, absent values as null. Date fields given as RFC 3339 text
/// are sent as epoch milliseconds.
///
/// # Errors
///
/// Returns [`ClientError::Geometry`] when the geometry value cannot be converted.
pub fn prepare_feature_for_submission(
    codec: &GeometryCodec,
    metadata: &FeatureClassMetadata,
    data: &Map<String, Value>,
) -> ClientResult<Value> {
    let mut submission = Map::new();

    if let Some(geometry_field) = metadata.geometry_field()
        && let Some(value) = data.get(&geometry_field.name).filter(|v| !v.is_null())
        && let Some(native) = codec.submission_geometry(value)?
    {
        submission.insert(
            "geometry".to_string(),
            serde_json::to_value(native).map_err(|e| ClientError::InvalidInput(e.to_string()))?,
        );
    }

    let attributes: Map<String, Value> = metadata
        .fields
        .iter()
        .filter(|field| !field.field_type.is_geometry())
        .map(|field| (field.name.clone(), submission_value(data.get(&field.name), field)))
        .collect();
    submission.insert("attributes".to_string(), Value::Object(attributes));

    Ok(Value::Object(submission))
}

fn submission_value(value: Option<&Value>, field: &FieldInfo) -> Value {
    match value {
        None => Value::Null,
        Some(Value::String(text)) if field.field_type.is_date() => {
            match DateTime::parse_from_rfc3339(text) {
                Ok(date) => Value::from(date.timestamp_millis()),
                Err(_) => Value::String(text.clone()),
            }
        }
        Some(value) => value.clone(),
    }
}

impl ServiceClient {
    /// Add a feature; returns its new object id
    ///
    /// Resolves to `None` without contacting the service when every value in
    /// `data` is blank, and to `None` when the service rejects the add.
    ///
    /// # Errors
    ///
    /// Transport and service errors, unconvertible geometry, or a malformed
    /// edit response.
    pub async fn insert_feature(
        &self,
        feature_class: &FeatureClassId,
        data: &Map<String, Value>,
    ) -> ClientResult<Option<i64>> {
        if !not_all_blank(data) {
            debug!(feature_class = %feature_class, "Insert skipped, all values blank");
            return Ok(None);
        }

        let feature = self.prepare_feature(feature_class, data).await?;
        let results = self
            .apply_edits(EditBatch::add(feature_class.clone(), feature))
            .await?;

        let object_id = check_insert_success(feature_class, &results);
        match object_id {
            Some(id) => info!(feature_class = %feature_class, object_id = id, "Feature added"),
            None => warn!(feature_class = %feature_class, "Add rejected by service"),
        }
        Ok(object_id)
    }

    /// Update a feature; `data` must carry the identifier field
    ///
    /// Resolves to `false` without contacting the service when every value in
    /// `data` is blank.
    ///
    /// # Errors
    ///
    /// Transport and service errors, unconvertible geometry, or a malformed
    /// edit response.
    pub async fn update_feature(
        &self,
        feature_class: &FeatureClassId,
        data: &Map<String, Value>,
    ) -> ClientResult<bool> {
        if !not_all_blank(data) {
            debug!(feature_class = %feature_class, "Update skipped, all values blank");
            return Ok(false);
        }

        let feature = self.prepare_feature(feature_class, data).await?;
        let results = self
            .apply_edits(EditBatch::update(feature_class.clone(), feature))
            .await?;

        let applied = if self.config.strict_update_results {
            update_outcome(feature_class, &results) == UpdateOutcome::Applied
        } else {
            check_update_success(feature_class, &results)
        };
        debug!(feature_class = %feature_class, applied, "Update complete");
        Ok(applied)
    }

    /// Delete a feature by object id
    ///
    /// # Errors
    ///
    /// Transport and service errors, or a malformed edit response.
    pub async fn delete_feature(
        &self,
        feature_class: &FeatureClassId,
        object_id: i64,
    ) -> ClientResult<bool> {
        let results = self
            .apply_edits(EditBatch::delete(feature_class.clone(), object_id))
            .await?;

        let deleted = check_delete_success(feature_class, &results);
        debug!(feature_class = %feature_class, object_id, deleted, "Delete complete");
        Ok(deleted)
    }

    /// Edit payload for `data` against the feature class schema
    ///
    /// # Errors
    ///
    /// Metadata fetch failures and unconvertible geometry.
    pub async fn prepare_feature(
        &self,
        feature_class: &FeatureClassId,
        data: &Map<String, Value>,
    ) -> ClientResult<Value> {
        let metadata = self.feature_class_details(feature_class).await?;
        prepare_feature_for_submission(&self.codec, &metadata, data)
    }

    async fn apply_edits(&self, batch: EditBatch) -> ClientResult<Vec<EditResultBlock>> {
        let mut params = QueryParams::new();
        params.insert(
            "edits".to_string(),
            serde_json::to_value(vec![batch]).map_err(|e| ClientError::InvalidInput(e.to_string()))?,
        );

        let response = self.request(&[FEATURE_SERVER, "applyEdits"], params).await?;
        parse_edit_results(&response)
    }
}
