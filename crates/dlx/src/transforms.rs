//! 🔄 Transforms: the per-record hook between the page and the lake 🎭
//!
//! 🎬 COLD OPEN. INT. CUSTOMS DESK, 2:47 AM
//!
//! Every record passes through here on its way from the page to the part buffer.
//! Most of them get waved through without a second look. Some get a stamp saying
//! when they arrived and what they are. None of them get interrogated. We are not
//! that kind of border.
//!
//! ## Knowledge Graph 🧠
//! - Trait: [`Transform`], one record in, one record out
//! - Impls: [`Passthrough`], [`IngestMetadata`], and a caller-provided closure
//! - Dispatcher: [`DocumentTransformer`], same trait → impls → enum → `from_config`
//!   pattern as the backends
//! - Used by: the SinkWorker, once per record, before buffering for the composer
//!
//! ⚠️ No validation, no dedup, no enrichment beyond the stamp. Records are moved, not judged. 🦆

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::app_config::TransformConfig;
use crate::common::Entity;

pub(crate) mod ingest_metadata;
pub(crate) mod passthrough;

pub(crate) use ingest_metadata::IngestMetadata;
pub(crate) use passthrough::Passthrough;

/// 🧩 A caller-supplied record transform. Gets the entity so one closure can serve both pipelines.
pub type RecordTransformFn = dyn Fn(Entity, Value) -> Result<Value> + Send + Sync;

/// 🔄 One JSON record in, one JSON record out.
///
/// # Contract 📜
/// - Output MUST still be valid to serialize. It's a `Value`, so it is.
/// - `Err` fails the whole pipeline. A transform that can't handle a record is a bug, not a skip.
pub(crate) trait Transform: std::fmt::Debug {
    fn transform(&self, record: Value) -> Result<Value>;
}

/// 🧩 Wraps the closure so the enum can stay `Debug` and `Clone`.
#[derive(Clone)]
pub(crate) struct CustomTransform {
    entity: Entity,
    func: Arc<RecordTransformFn>,
}

impl CustomTransform {
    pub(crate) fn new(entity: Entity, func: Arc<RecordTransformFn>) -> Self {
        Self { entity, func }
    }
}

impl std::fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomTransform")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

impl Transform for CustomTransform {
    fn transform(&self, record: Value) -> Result<Value> {
        (self.func)(self.entity, record)
    }
}

/// 🎭 The polymorphic transformer. Resolved once per pipeline, applied once per record.
#[derive(Debug, Clone)]
pub(crate) enum DocumentTransformer {
    Passthrough(Passthrough),
    IngestMetadata(IngestMetadata),
    Custom(CustomTransform),
}

impl DocumentTransformer {
    /// 🔧 Resolve the transform configured for `entity`. `ingested_at` is the pipeline start,
    /// so every record in a run carries the same stamp.
    pub(crate) fn from_config(config: TransformConfig, entity: Entity, ingested_at: DateTime<Utc>) -> Self {
        match config {
            TransformConfig::Passthrough => Self::Passthrough(Passthrough),
            TransformConfig::IngestMetadata => Self::IngestMetadata(IngestMetadata::new(entity, ingested_at)),
        }
    }
}

impl Transform for DocumentTransformer {
    #[inline]
    fn transform(&self, record: Value) -> Result<Value> {
        match self {
            Self::Passthrough(t) => t.transform(record),
            Self::IngestMetadata(t) => t.transform(record),
            Self::Custom(t) => t.transform(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_config_picks_the_right_costume() {
        let the_start = Utc::now();
        assert!(matches!(
            DocumentTransformer::from_config(TransformConfig::Passthrough, Entity::Users, the_start),
            DocumentTransformer::Passthrough(_)
        ));
        assert!(matches!(
            DocumentTransformer::from_config(TransformConfig::IngestMetadata, Entity::Content, the_start),
            DocumentTransformer::IngestMetadata(_)
        ));
    }

    #[test]
    fn the_one_where_a_closure_gets_told_which_entity_it_is_handling() -> Result<()> {
        let the_closure: Arc<RecordTransformFn> = Arc::new(|entity: Entity, mut record: Value| -> Result<Value> {
            record["seen_by"] = json!(entity.as_str());
            Ok(record)
        });
        let the_transformer = DocumentTransformer::Custom(CustomTransform::new(Entity::Content, the_closure));

        let the_output = the_transformer.transform(json!({"content_id": "content_1"}))?;
        assert_eq!(the_output["seen_by"], "content");
        assert_eq!(the_output["content_id"], "content_1");
        Ok(())
    }

    #[test]
    fn the_one_where_a_failing_closure_fails_loudly() {
        let the_grump: Arc<RecordTransformFn> = Arc::new(|_: Entity, _: Value| -> Result<Value> { anyhow::bail!("not today") });
        let the_transformer = DocumentTransformer::Custom(CustomTransform::new(Entity::Users, the_grump));
        assert!(the_transformer.transform(json!({})).is_err());
    }
}
