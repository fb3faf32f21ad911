//! Batch-edit payloads and interpretation of `applyEdits` responses.
//!
//! The response is a sequence of per-feature-class blocks. Blocks are matched
//! by `id`, never by position.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

/// Identifier of a feature class (layer or table) within a service
///
/// The service reports ids as numbers; callers often hold them as strings.
/// Both forms compare equal and numeric ids serialize as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureClassId(String);

impl FeatureClassId {
    /// Borrow the id text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for FeatureClassId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for FeatureClassId {
    fn from(id: &str) -> Self {
        let id = id.trim();
        match id.parse::<i64>() {
            Ok(n) => Self::from(n),
            Err(_) => Self(id.to_string()),
        }
    }
}

impl From<String> for FeatureClassId {
    fn from(id: String) -> Self {
        Self::from(id.as_str())
    }
}

impl std::str::FromStr for FeatureClassId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Serialize for FeatureClassId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for FeatureClassId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = FeatureClassId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a feature class id as number or string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(FeatureClassId::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(FeatureClassId(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(FeatureClassId::from(v))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// One `edits` entry: a feature class and exactly one operation list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditBatch {
    /// Target feature class
    pub id: FeatureClassId,
    /// Operation payload
    #[serde(flatten)]
    pub operation: EditOperation,
}

/// The operation list of an [`EditBatch`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    /// New features (`{geometry, attributes}` objects)
    Adds(Vec<Value>),
    /// Changed features (`{geometry, attributes}` objects)
    Updates(Vec<Value>),
    /// Object ids to remove
    Deletes(Vec<i64>),
}

impl EditBatch {
    /// Add one feature
    pub fn add(id: FeatureClassId, feature: Value) -> Self {
        Self {
            id,
            operation: EditOperation::Adds(vec![feature]),
        }
    }

    /// Update one feature
    pub fn update(id: FeatureClassId, feature: Value) -> Self {
        Self {
            id,
            operation: EditOperation::Updates(vec![feature]),
        }
    }

    /// Delete one feature
    pub fn delete(id: FeatureClassId, object_id: i64) -> Self {
        Self {
            id,
            operation: EditOperation::Deletes(vec![object_id]),
        }
    }
}

/// Error attached to a failed edit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditError {
    /// Service error code
    #[serde(default)]
    pub code: i64,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// Outcome of one feature within a result block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    /// Whether the service applied the edit
    #[serde(default)]
    pub success: bool,
    /// Object id of the affected feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<i64>,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EditError>,
}

/// Results for one feature class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResultBlock {
    /// Feature class the results belong to
    pub id: FeatureClassId,
    /// Results of `adds`
    #[serde(default)]
    pub add_results: Option<Vec<EditOutcome>>,
    /// Results of `updates`
    #[serde(default)]
    pub update_results: Option<Vec<EditOutcome>>,
    /// Results of `deletes`
    #[serde(default)]
    pub delete_results: Option<Vec<EditOutcome>>,
}

/// What an update response says about the submitted feature class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Every reported entry succeeded
    Applied,
    /// At least one entry failed
    Rejected,
    /// No result entries were reported for the feature class
    Unreported,
}

/// Decode an `applyEdits` response
///
/// # Errors
///
/// Returns [`ClientError::MalformedResponse`] if the body is not an array of
/// result blocks.
pub fn parse_edit_results(response: &Value) -> ClientResult<Vec<EditResultBlock>> {
    Vec::<EditResultBlock>::deserialize(response)
        .map_err(|e| ClientError::MalformedResponse(format!("applyEdits response: {e}")))
}

fn find_block<'a>(id: &FeatureClassId, blocks: &'a [EditResultBlock]) -> Option<&'a EditResultBlock> {
    blocks.iter().find(|block| &block.id == id)
}

/// True only if the first delete result of the matching block succeeded
pub fn check_delete_success(id: &FeatureClassId, blocks: &[EditResultBlock]) -> bool {
    find_block(id, blocks)
        .and_then(|block| block.delete_results.as_deref())
        .and_then(<[EditOutcome]>::first)
        .is_some_and(|outcome| outcome.success)
}

/// Object id of the first add result of the matching block, if it succeeded
pub fn check_insert_success(id: &FeatureClassId, blocks: &[EditResultBlock]) -> Option<i64> {
    find_block(id, blocks)
        .and_then(|block| block.add_results.as_deref())
        .and_then(<[EditOutcome]>::first)
        .filter(|outcome| outcome.success)
        .and_then(|outcome| outcome.object_id)
}

/// Three-state reading of an update response
pub fn update_outcome(id: &FeatureClassId, blocks: &[EditResultBlock]) -> UpdateOutcome {
    match find_block(id, blocks).and_then(|block| block.update_results.as_deref()) {
        None | Some([]) => UpdateOutcome::Unreported,
        Some(results) if results.iter().all(|r| r.success) => UpdateOutcome::Applied,
        Some(_) => UpdateOutcome::Rejected,
    }
}

/// True unless some update entry of the matching block failed
///
/// A response that reports nothing for the feature class counts as success and
/// is logged; use [`update_outcome`] to tell the cases apart.
pub fn check_update_success(id: &FeatureClassId, blocks: &[EditResultBlock]) -> bool {
    match update_outcome(id, blocks) {
        UpdateOutcome::Applied => true,
        UpdateOutcome::Rejected => false,
        UpdateOutcome::Unreported => {
            warn!(feature_class = %id, "Update response has no results for feature class, assuming success");
            true
        }
    }
}

/// False only if every value is null, absent or the empty string
pub fn not_all_blank(data: &Map<String, Value>) -> bool {
    data.values().any(|value| match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blocks(value: Value) -> Vec<EditResultBlock> {
        parse_edit_results(&value).unwrap()
    }

    #[test]
    fn test_feature_class_id_forms_compare_equal() {
        let from_number: FeatureClassId = serde_json::from_value(json!(7)).unwrap();
        let from_string: FeatureClassId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_value(&from_string).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(FeatureClassId::from("parcels")).unwrap(),
            json!("parcels")
        );
    }

    #[test]
    fn test_feature_class_id_zero_padded_matches_response() {
        let submitted = FeatureClassId::from("07");
        assert_eq!(submitted.as_str(), "7");

        let batch = EditBatch::delete(submitted.clone(), 41);
        let wire = serde_json::to_value(&batch).unwrap();
        let echoed: FeatureClassId = serde_json::from_value(wire["id"].clone()).unwrap();
        assert_eq!(echoed, submitted);

        let response = blocks(json!([{"id": 7, "deleteResults": [{"success": true}]}]));
        assert!(check_delete_success(&submitted, &response));
    }

    #[test]
    fn test_edit_batch_wire_shape() {
        let batch = EditBatch::delete(FeatureClassId::from("3"), 41);
        assert_eq!(
            serde_json::to_value(vec![batch]).unwrap(),
            json!([{"id": 3, "deletes": [41]}])
        );

        let batch = EditBatch::add(FeatureClassId::from(3), json!({"attributes": {"NAME": "a"}}));
        assert_eq!(
            serde_json::to_value(batch).unwrap(),
            json!({"id": 3, "adds": [{"attributes": {"NAME": "a"}}]})
        );
    }

    #[test]
    fn test_check_update_success_requires_every_entry() {
        let response = blocks(json!([
            {"id": "7", "updateResults": [{"success": true}, {"success": false}]}
        ]));
        assert!(!check_update_success(&FeatureClassId::from("7"), &response));
        assert_eq!(
            update_outcome(&FeatureClassId::from(7), &response),
            UpdateOutcome::Rejected
        );
    }

    #[test]
    fn test_check_update_success_missing_block_defaults_true() {
        let response = blocks(json!([
            {"id": 2, "updateResults": [{"success": false}]}
        ]));
        let id = FeatureClassId::from(7);
        assert_eq!(update_outcome(&id, &response), UpdateOutcome::Unreported);
        assert!(check_update_success(&id, &response));
    }

    #[test]
    fn test_check_insert_success() {
        let response = blocks(json!([
            {"id": "7", "addResults": [{"success": true, "objectId": 42}]}
        ]));
        assert_eq!(check_insert_success(&FeatureClassId::from("7"), &response), Some(42));

        let failed = blocks(json!([
            {"id": 7, "addResults": [{"success": false, "error": {"code": 1000, "description": "bad"}}]}
        ]));
        assert_eq!(check_insert_success(&FeatureClassId::from(7), &failed), None);
    }

    #[test]
    fn test_check_delete_success() {
        let response = blocks(json!([{"id": "7", "deleteResults": [{"success": true}]}]));
        assert!(check_delete_success(&FeatureClassId::from("7"), &response));
        assert!(!check_delete_success(&FeatureClassId::from("8"), &response));

        let no_results = blocks(json!([{"id": 7}]));
        assert!(!check_delete_success(&FeatureClassId::from(7), &no_results));
    }

    #[test]
    fn test_blocks_matched_by_id_not_position() {
        let response = blocks(json!([
            {"id": 1, "deleteResults": [{"success": false}]},
            {"id": 5, "deleteResults": [{"success": true}]}
        ]));
        assert!(check_delete_success(&FeatureClassId::from(5), &response));
        assert!(!check_delete_success(&FeatureClassId::from(1), &response));
    }

    #[test]
    fn test_malformed_response() {
        let err = parse_edit_results(&json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[test]
    fn test_not_all_blank() {
        let blank = json!({"a": null, "b": ""});
        assert!(!not_all_blank(blank.as_object().unwrap()));

        let filled = json!({"a": null, "b": "x"});
        assert!(not_all_blank(filled.as_object().unwrap()));

        let zero = json!({"count": 0});
        assert!(not_all_blank(zero.as_object().unwrap()));

        assert!(!not_all_blank(&Map::new()));
    }
}
