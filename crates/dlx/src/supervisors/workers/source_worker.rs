//! 🚰 The SourceWorker: turns the faucet, fills the channel, says when it's done.
//!
//! It doesn't know what a lake is. It doesn't know what a part is. It knows pages,
//! and it knows how to count them. The progress bar lives here, because this is
//! where the envelope's `total` shows up first.

use anyhow::{Context, Result};
use async_channel::Sender;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{HungUp, SourceMessage, Worker};
use crate::backends::{Source, SourceBackend};
use crate::common::Entity;
use crate::progress::ProgressMetrics;

#[derive(Debug)]
pub(crate) struct SourceWorker {
    entity: Entity,
    tx: Sender<SourceMessage>,
    source: SourceBackend,
    progress: ProgressMetrics,
}

impl SourceWorker {
    pub(crate) fn new(entity: Entity, tx: Sender<SourceMessage>, source: SourceBackend, progress: ProgressMetrics) -> Self {
        Self {
            entity,
            tx,
            source,
            progress,
        }
    }

    async fn pump(&mut self) -> Result<u64> {
        let mut the_total_is_known = false;
        while let Some(page) = self
            .source
            .next_page()
            .await
            .with_context(|| format!("💀 The {} source gave up mid-collection", self.entity))?
        {
            if let (false, Some(total)) = (the_total_is_known, page.total) {
                self.progress.set_total(total);
                the_total_is_known = true;
            }
            self.progress.update(page.len() as u64);
            debug!("📄 {} page of {} records heading for the sink", self.entity, page.len());

            // -- 📵 a closed channel means the sink already failed. its error is the interesting one.
            self.tx
                .send(SourceMessage::Page(page))
                .await
                .map_err(|_| HungUp("sink"))?;
        }

        self.tx
            .send(SourceMessage::Finished)
            .await
            .map_err(|_| HungUp("sink"))?;
        Ok(self.progress.records_done())
    }
}

impl Worker for SourceWorker {
    type Output = u64;

    fn start(mut self) -> JoinHandle<Result<u64>> {
        tokio::spawn(async move {
            debug!("🚰 SourceWorker for {} opening the faucet...", self.entity);
            let result = self.pump().await;
            match &result {
                Ok(fetched) => {
                    self.progress.finish();
                    debug!("🏁 SourceWorker for {} done: {} records", self.entity, fetched);
                }
                Err(_) => self.progress.abandon(),
            }
            // -- 🔒 tx drops here, closing the channel either way
            result
        })
    }
}
