//! Feature-class and service metadata, and the single-flight cache over them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::edits::FeatureClassId;
use crate::error::ClientResult;
use crate::geometry::{GeometryType, SpatialReference};

/// Field type tag, e.g. `esriFieldTypeString`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldType(pub String);

impl FieldType {
    /// Reserved tag of the geometry field
    pub const GEOMETRY: &'static str = "esriFieldTypeGeometry";
    /// Reserved tag of the identifier field
    pub const OID: &'static str = "esriFieldTypeOID";
    /// Date fields, submitted as epoch milliseconds
    pub const DATE: &'static str = "esriFieldTypeDate";

    /// True if this is the geometry tag
    pub fn is_geometry(&self) -> bool {
        self.0 == Self::GEOMETRY
    }

    /// True if this is the identifier tag
    pub fn is_oid(&self) -> bool {
        self.0 == Self::OID
    }

    /// True if this is the date tag
    pub fn is_date(&self) -> bool {
        self.0 == Self::DATE
    }
}

/// One entry of a feature class schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Type tag
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Everything else the service reports (length, domain, nullable, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Descriptor of one feature class (`MapServer/<id>`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureClassMetadata {
    /// Schema
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    /// Remaining descriptor members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureClassMetadata {
    /// First field tagged as geometry
    pub fn geometry_field(&self) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.field_type.is_geometry())
    }

    /// First field tagged as identifier
    pub fn identifier_field(&self) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.field_type.is_oid())
    }

    /// Declared `geometryType`, if recognized
    pub fn geometry_type(&self) -> Option<GeometryType> {
        self.extra
            .get("geometryType")
            .and_then(|v| GeometryType::deserialize(v).ok())
    }

    /// Spatial reference of the class extent, if reported
    pub fn spatial_reference(&self) -> Option<SpatialReference> {
        self.extra
            .get("extent")
            .and_then(|extent| extent.get("spatialReference"))
            .and_then(|sr| SpatialReference::deserialize(sr).ok())
    }

    /// Display name, if reported
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }
}

/// Short entry for a layer or table in the service descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSummary {
    /// Feature class id
    pub id: FeatureClassId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Remaining members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Whole-service descriptor (`MapServer`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Spatial layers
    #[serde(default)]
    pub layers: Vec<LayerSummary>,
    /// Non-spatial tables
    #[serde(default)]
    pub tables: Vec<LayerSummary>,
    /// Remaining members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Process-lifetime metadata cache with per-key single-flight
///
/// Concurrent lookups for the same key share one in-flight fetch. A failed
/// fetch leaves the slot empty so the next caller fetches again. Entries are
/// never invalidated.
#[derive(Debug, Default)]
pub struct MetadataCache {
    feature_classes: DashMap<FeatureClassId, Arc<OnceCell<Arc<FeatureClassMetadata>>>>,
    service: OnceCell<Arc<ServiceMetadata>>,
}

impl MetadataCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for `id`, or the result of `fetch`
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`; nothing is cached in that case.
    pub async fn feature_class<F, Fut>(
        &self,
        id: &FeatureClassId,
        fetch: F,
    ) -> ClientResult<Arc<FeatureClassMetadata>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<FeatureClassMetadata>>,
    {
        // Clone the cell out so the shard lock is not held across the fetch
        let cell = Arc::clone(&self.feature_classes.entry(id.clone()).or_default());

        let metadata = cell
            .get_or_try_init(|| async {
                debug!(feature_class = %id, "Fetching feature class metadata");
                fetch().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(metadata))
    }

    /// Cached service metadata, or the result of `fetch`
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`; nothing is cached in that case.
    pub async fn service<F, Fut>(&self, fetch: F) -> ClientResult<Arc<ServiceMetadata>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<ServiceMetadata>>,
    {
        let metadata = self
            .service
            .get_or_try_init(|| async {
                debug!("Fetching service metadata");
                fetch().await.map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(metadata))
    }

    /// Cached metadata for `id` without fetching
    pub fn cached_feature_class(&self, id: &FeatureClassId) -> Option<Arc<FeatureClassMetadata>> {
        self.feature_classes
            .get(id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of feature classes with metadata loaded
    pub fn feature_class_count(&self) -> usize {
        self.feature_classes
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn parcels() -> FeatureClassMetadata {
        serde_json::from_value(json!({
            "name": "Parcels",
            "geometryType": "esriGeometryPolygon",
            "extent": {"xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1, "spatialReference": {"wkid": 4326}},
            "fields": [
                {"name": "OBJECTID", "type": "esriFieldTypeOID", "alias": "OBJECTID"},
                {"name": "SHAPE", "type": "esriFieldTypeGeometry"},
                {"name": "NAME", "type": "esriFieldTypeString", "length": 50},
                {"name": "SURVEYED", "type": "esriFieldTypeDate"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_reserved_fields() {
        let metadata = parcels();
        assert_eq!(metadata.geometry_field().unwrap().name, "SHAPE");
        assert_eq!(metadata.identifier_field().unwrap().name, "OBJECTID");
        assert_eq!(metadata.geometry_type(), Some(GeometryType::Polygon));
        assert_eq!(metadata.spatial_reference(), Some(SpatialReference::wgs84()));
        assert_eq!(metadata.name(), Some("Parcels"));
        assert_eq!(metadata.fields[2].extra["length"], json!(50));
    }

    #[test]
    fn test_missing_reserved_fields() {
        let table: FeatureClassMetadata = serde_json::from_value(json!({
            "fields": [{"name": "NOTE", "type": "esriFieldTypeString"}]
        }))
        .unwrap();
        assert!(table.geometry_field().is_none());
        assert!(table.identifier_field().is_none());
        assert!(table.geometry_type().is_none());
    }

    #[test]
    fn test_service_metadata_layers() {
        let service: ServiceMetadata = serde_json::from_value(json!({
            "currentVersion": 10.91,
            "layers": [{"id": 0, "name": "Parcels"}, {"id": 3, "name": "Wells"}],
            "tables": [{"id": 7, "name": "Inspections"}]
        }))
        .unwrap();
        assert_eq!(service.layers.len(), 2);
        assert_eq!(service.tables[0].id, FeatureClassId::from(7));
        assert_eq!(service.extra["currentVersion"], json!(10.91));
    }

    #[tokio::test]
    async fn test_sequential_lookups_fetch_once() {
        let cache = MetadataCache::new();
        let calls = AtomicUsize::new(0);
        let id = FeatureClassId::from(2);

        for _ in 0..3 {
            let metadata = cache
                .feature_class(&id, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(parcels())
                })
                .await
                .unwrap();
            assert_eq!(metadata.name(), Some("Parcels"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.cached_feature_class(&id).is_some());
        assert_eq!(cache.feature_class_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let cache = Arc::new(MetadataCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let id = FeatureClassId::from("4");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let id = id.clone();
                tokio::spawn(async move {
                    cache
                        .feature_class(&id, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(parcels())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let cache = MetadataCache::new();
        let id = FeatureClassId::from(1);

        let err = cache
            .feature_class(&id, || async {
                Err(ClientError::MalformedResponse("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
        assert!(cache.cached_feature_class(&id).is_none());

        let metadata = cache.feature_class(&id, || async { Ok(parcels()) }).await;
        assert!(metadata.is_ok());
    }

    #[tokio::test]
    async fn test_service_singleton() {
        let cache = MetadataCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            cache
                .service(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ServiceMetadata {
                        layers: Vec::new(),
                        tables: Vec::new(),
                        extra: Map::new(),
                    })
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
