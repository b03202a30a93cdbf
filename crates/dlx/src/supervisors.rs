//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where workers toil endlessly..."
//! 🎬 "One supervisor dared to manage them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor module: part middle manager, part helicopter parent.
//!
//! It naps while the rest of the stack boots, then runs each configured pipeline in
//! order. One at a time. `users` first, then `content`, unless somebody's TOML says
//! otherwise. A pipeline that fails is written down and the next one still gets its turn.
//!
//! 🔒 Workers stay private. Like Fight Club, but for async tasks. First rule: you don't pub the workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::app_config::{AppConfig, PipelineConfig};
use crate::backends::{SinkBackend, SourceBackend};
use crate::common::Entity;
use crate::composers::ComposerBackend;
use crate::layout::ObjectKeyLayout;
use crate::transforms::{CustomTransform, DocumentTransformer, RecordTransformFn};

mod pipeline;
mod workers;

use pipeline::Pipeline;

/// 📋 What one successful pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub entity: Entity,
    pub records: u64,
    /// 🔑 Object keys, in upload order.
    pub objects: Vec<String>,
    pub elapsed: Duration,
}

/// 🎭 How a pipeline ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(PipelineReport),
    Failed { entity: Entity, error: anyhow::Error },
}

impl PipelineOutcome {
    pub fn entity(&self) -> Entity {
        match self {
            Self::Completed(report) => report.entity,
            Self::Failed { entity, .. } => *entity,
        }
    }
}

/// 📜 Every outcome of a run, in the order the pipelines ran.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<PipelineOutcome>,
}

impl RunSummary {
    pub fn reports(&self) -> impl Iterator<Item = &PipelineReport> {
        self.outcomes.iter().filter_map(|o| match o {
            PipelineOutcome::Completed(report) => Some(report),
            PipelineOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (Entity, &anyhow::Error)> {
        self.outcomes.iter().filter_map(|o| match o {
            PipelineOutcome::Failed { entity, error } => Some((*entity, error)),
            PipelineOutcome::Completed(_) => None,
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// 📦 The Supervisor: because even async tasks need someone hovering over them
/// asking "is it done yet?" every 5 milliseconds.
pub struct Supervisor {
    app_config: AppConfig,
    custom_transforms: HashMap<Entity, Arc<RecordTransformFn>>,
}

impl Supervisor {
    pub fn new(app_config: AppConfig) -> Self {
        Self {
            app_config,
            custom_transforms: HashMap::new(),
        }
    }

    /// 🧩 Replace the configured transform for `entity` with a closure.
    ///
    /// For library callers who need something the config can't express. The closure
    /// runs once per record, on the sink side, before the record is buffered.
    pub fn with_custom_transform<F>(mut self, entity: Entity, transform: F) -> Self
    where
        F: Fn(Entity, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.custom_transforms.insert(entity, Arc::new(transform));
        self
    }

    /// 🚀 Nap, then run every configured pipeline in order.
    ///
    /// `on_finished` is told about each pipeline as soon as it ends, success or not.
    /// The returned summary has all of them.
    pub async fn run_all<F>(&self, mut on_finished: F) -> RunSummary
    where
        F: FnMut(&PipelineOutcome),
    {
        let delay = self.app_config.runtime.startup_delay_secs;
        if delay > 0 {
            info!("💤 giving the data server and the lake {}s to wake up", delay);
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        let mut summary = RunSummary::default();
        for pipeline_config in &self.app_config.pipelines {
            let entity = pipeline_config.entity;
            let outcome = match self.run_pipeline(pipeline_config).await {
                Ok(report) => PipelineOutcome::Completed(report),
                Err(error) => {
                    error!("💀 {} pipeline failed: {:#}", entity, error);
                    PipelineOutcome::Failed { entity, error }
                }
            };
            on_finished(&outcome);
            summary.outcomes.push(outcome);
        }
        summary
    }

    /// 🏗️ Resolve source, sink, transform, composer and key layout, then run.
    async fn run_pipeline(&self, pipeline_config: &PipelineConfig) -> Result<PipelineReport> {
        let entity = pipeline_config.entity;
        let started_at = Utc::now();
        let common_config = self.app_config.sink_config.common_config();

        let transformer = match self.custom_transforms.get(&entity) {
            Some(func) => DocumentTransformer::Custom(CustomTransform::new(entity, Arc::clone(func))),
            None => DocumentTransformer::from_config(pipeline_config.transform, entity, started_at),
        };
        let source = SourceBackend::from_config(entity, &self.app_config.source_config)?;
        let sink = SinkBackend::from_config(&self.app_config.sink_config).await?;

        Pipeline {
            entity,
            source,
            sink,
            transformer,
            composer: ComposerBackend::from_sink_config(&common_config),
            layout: ObjectKeyLayout::new(&common_config.key_prefix, entity, started_at),
            part_size: common_config.part_size(),
            queue_capacity: self.app_config.runtime.queue_capacity,
            show_progress: self.app_config.runtime.show_progress,
        }
        .run()
        .await
    }
}
