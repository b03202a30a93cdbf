//! 🏷️ Ingest Metadata: a luggage tag on every record.
//!
//! Adds `_entity` and `_ingested_at` to each record so a query over the lake can tell
//! which run a row came from without parsing the object key. That's it. That's the feature.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::Transform;
use crate::common::Entity;

pub(crate) const ENTITY_FIELD: &str = "_entity";
pub(crate) const INGESTED_AT_FIELD: &str = "_ingested_at";

/// 🏷️ Stamps `_entity` and `_ingested_at` (RFC 3339, `Z`) onto object records.
///
/// Existing fields with the same names are overwritten. A record that isn't a JSON
/// object has nowhere to put a tag and is an error.
#[derive(Debug, Clone)]
pub(crate) struct IngestMetadata {
    entity: Entity,
    ingested_at: String,
}

impl IngestMetadata {
    pub(crate) fn new(entity: Entity, ingested_at: DateTime<Utc>) -> Self {
        Self {
            entity,
            ingested_at: ingested_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl Transform for IngestMetadata {
    fn transform(&self, mut record: Value) -> Result<Value> {
        let Some(fields) = record.as_object_mut() else {
            anyhow::bail!(
                "💀 Can't tag a {} record that isn't a JSON object. Got: {}",
                self.entity,
                record
            );
        };
        fields.insert(ENTITY_FIELD.to_string(), Value::from(self.entity.as_str()));
        fields.insert(INGESTED_AT_FIELD.to_string(), Value::from(self.ingested_at.as_str()));
        Ok(record)
    }
}
