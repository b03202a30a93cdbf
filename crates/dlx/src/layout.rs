//! 🗂️ Object key layout: where in the lake a part lands.
//!
//! ```text
//! {prefix}/{entity}/year=YYYY/month=MM/day=DD/{entity}_{YYYYmmddTHHMMSSZ}_part-{NNNN}.json
//! ```
//!
//! Hive-style date partitions so query engines can prune by day, a run timestamp so two
//! runs on the same day don't overwrite each other, and a part number so one run can be
//! split across objects. All dates are the pipeline's start time in UTC.

use chrono::{DateTime, Utc};

use crate::common::Entity;

/// 🗂️ Builds the object keys for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObjectKeyLayout {
    prefix: String,
    entity: Entity,
    started_at: DateTime<Utc>,
}

impl ObjectKeyLayout {
    /// Slashes and whitespace around and inside the prefix are normalized. An empty prefix drops the segment.
    pub(crate) fn new(prefix: &str, entity: Entity, started_at: DateTime<Utc>) -> Self {
        let prefix = prefix
            .split('/')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            prefix,
            entity,
            started_at,
        }
    }

    /// 🔑 The key for part `part` of this run. Parts count from zero.
    pub(crate) fn key_for_part(&self, part: usize) -> String {
        let entity = self.entity.as_str();
        let partition = self.started_at.format("year=%Y/month=%m/day=%d");
        let run_stamp = self.started_at.format("%Y%m%dT%H%M%SZ");
        let file_name = format!("{entity}_{run_stamp}_part-{part:04}.json");
        if self.prefix.is_empty() {
            format!("{entity}/{partition}/{file_name}")
        } else {
            format!("{}/{entity}/{partition}/{file_name}", self.prefix)
        }
    }
}
