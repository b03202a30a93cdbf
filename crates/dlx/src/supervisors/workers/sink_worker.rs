//! 🎬 *[a channel fills with pages. somewhere, a lake waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 🗑️ The SinkWorker: patient, tireless, and deeply unbothered by the chaos happening
//! upstream. It receives pages, runs each record through the transformer, buffers them,
//! and whenever a part fills up (or the source says it's finished) it composes the
//! buffer into one JSON array and hands it to the sink under the next key.
//!
//! 🦆 (the duck has no comment at this time)

use anyhow::{Context, Result};
use async_channel::Receiver;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{HungUp, SourceMessage, Worker};
use crate::backends::{Sink, SinkBackend};
use crate::composers::{Composer, ComposerBackend};
use crate::layout::ObjectKeyLayout;
use crate::transforms::{DocumentTransformer, Transform};

/// 📦 What the sink side has to show for itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SinkOutput {
    pub(crate) records: u64,
    pub(crate) objects: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct SinkWorker {
    rx: Receiver<SourceMessage>,
    sink: SinkBackend,
    transformer: DocumentTransformer,
    composer: ComposerBackend,
    layout: ObjectKeyLayout,
    /// ✂️ `None` = the whole run is one object.
    part_size: Option<usize>,
    buffer: Vec<Value>,
    output: SinkOutput,
}

impl SinkWorker {
    pub(crate) fn new(
        rx: Receiver<SourceMessage>,
        sink: SinkBackend,
        transformer: DocumentTransformer,
        composer: ComposerBackend,
        layout: ObjectKeyLayout,
        part_size: Option<usize>,
    ) -> Self {
        Self {
            rx,
            sink,
            transformer,
            composer,
            layout,
            part_size,
            buffer: Vec::new(),
            output: SinkOutput::default(),
        }
    }

    /// 📤 Compose the buffer and upload it as the next part.
    async fn flush(&mut self) -> Result<()> {
        let key = self.layout.key_for_part(self.output.objects.len());
        let body = self.composer.compose(&self.buffer)?;
        debug!("📤 part of {} records ({} bytes) → {}", self.buffer.len(), body.len(), key);
        self.sink
            .put_object(&key, body)
            .await
            .with_context(|| format!("💀 Uploading '{key}' failed"))?;
        self.output.objects.push(key);
        self.buffer.clear();
        Ok(())
    }

    async fn drain(&mut self) -> Result<()> {
        let mut finished = false;
        // -- 🔄 Err from recv = channel empty and closed. That's the only way out besides Finished.
        while let Ok(message) = self.rx.recv().await {
            match message {
                SourceMessage::Page(page) => {
                    for record in page.records {
                        let record = self
                            .transformer
                            .transform(record)
                            .with_context(|| format!("💀 Record #{} refused to transform", self.output.records + 1))?;
                        self.buffer.push(record);
                        self.output.records += 1;
                        if self.part_size.is_some_and(|limit| self.buffer.len() >= limit) {
                            self.flush().await?;
                        }
                    }
                }
                SourceMessage::Finished => {
                    finished = true;
                    break;
                }
            }
        }

        if !finished {
            // -- 💀 no final part for a run that didn't finish. half an array is not a snapshot.
            return Err(HungUp("source").into());
        }

        // -- 📭 an empty collection still gets its `[]`, so the lake knows the run happened
        if !self.buffer.is_empty() || self.output.objects.is_empty() {
            self.flush().await?;
        }
        self.sink.close().await.context("💀 SinkWorker failed to close the sink")
    }
}

impl Worker for SinkWorker {
    type Output = SinkOutput;

    fn start(mut self) -> JoinHandle<Result<SinkOutput>> {
        tokio::spawn(async move {
            debug!("📥 SinkWorker started draining channel...");
            self.drain().await?;
            debug!(
                "🏁 SinkWorker done: {} records in {} object(s)",
                self.output.records,
                self.output.objects.len()
            );
            Ok(self.output)
        })
    }
}
