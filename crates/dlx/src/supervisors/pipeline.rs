//! 🚰 One pipeline = one entity, one source, one sink, two workers, one channel.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::PipelineReport;
use super::workers::{HungUp, SinkOutput, SinkWorker, SourceWorker, Worker};
use crate::backends::{SinkBackend, SourceBackend};
use crate::common::Entity;
use crate::composers::ComposerBackend;
use crate::layout::ObjectKeyLayout;
use crate::progress::ProgressMetrics;
use crate::transforms::DocumentTransformer;

/// 🧰 Everything a pipeline run needs, resolved up front by the Supervisor (or a test).
#[derive(Debug)]
pub(crate) struct Pipeline {
    pub(crate) entity: Entity,
    pub(crate) source: SourceBackend,
    pub(crate) sink: SinkBackend,
    pub(crate) transformer: DocumentTransformer,
    pub(crate) composer: ComposerBackend,
    pub(crate) layout: ObjectKeyLayout,
    pub(crate) part_size: Option<usize>,
    pub(crate) queue_capacity: usize,
    pub(crate) show_progress: bool,
}

impl Pipeline {
    /// 🚀 Spawn both workers, wait for both, decide whose fault it was if anything broke.
    pub(crate) async fn run(self) -> Result<PipelineReport> {
        let started = Instant::now();
        let entity = self.entity;
        info!("🚰 {} pipeline starting", entity);

        let (tx, rx) = async_channel::bounded(self.queue_capacity.max(1));
        let source_worker = SourceWorker::new(
            entity,
            tx,
            self.source,
            ProgressMetrics::new(entity.to_string(), self.show_progress),
        );
        let sink_worker = SinkWorker::new(
            rx,
            self.sink,
            self.transformer,
            self.composer,
            self.layout,
            self.part_size,
        );

        let (source_joined, sink_joined) = futures::future::join(source_worker.start(), sink_worker.start()).await;
        let source_result = source_joined
            .context("💀 SourceWorker panicked")
            .and_then(|r| r);
        let sink_result = sink_joined.context("💀 SinkWorker panicked").and_then(|r| r);

        let SinkOutput { records, objects } = match (source_result, sink_result) {
            (Ok(fetched), Ok(output)) => {
                if fetched != output.records {
                    warn!(
                        "⚠️ {} source counted {} records but the sink wrote {}",
                        entity, fetched, output.records
                    );
                }
                output
            }
            (Err(source_error), Ok(_)) => return Err(source_error),
            (Ok(_), Err(sink_error)) => return Err(sink_error),
            // -- 🕵️ both sides failed. the one that didn't just hang up has the real story.
            (Err(source_error), Err(sink_error)) => {
                return Err(if sink_error.downcast_ref::<HungUp>().is_some() {
                    source_error
                } else {
                    sink_error
                });
            }
        };

        let report = PipelineReport {
            entity,
            records,
            objects,
            elapsed: started.elapsed(),
        };
        info!(
            "✅ {} pipeline done: {} records in {} object(s) in {:?}",
            entity,
            report.records,
            report.objects.len(),
            report.elapsed
        );
        Ok(report)
    }
}
