//! 🧵 Workers: the ones who actually do the work while the Supervisor takes all the
//! credit in the sprint retro.
//!
//! Two of them per pipeline, one on each end of a bounded channel:
//!
//! ```text
//! SourceWorker ── SourceMessage::Page ──▶ [ async_channel, bounded ] ──▶ SinkWorker
//!              ── SourceMessage::Finished ─────────────────────────────▶
//! ```
//!
//! ⚠️ "If you're reading this, the code review went poorly."

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::common::Page;

mod sink_worker;
mod source_worker;

pub(crate) use sink_worker::{SinkOutput, SinkWorker};
pub(crate) use source_worker::SourceWorker;

/// 🏗️ A background worker, that does work. duh.
///
/// "What's the DEAL with lifetime annotations? You borrow something,
///  you give it back. It's not that hard, Jerry!" (Seinfeld, on Rust)
pub(crate) trait Worker {
    type Output: Send + 'static;

    /// 🚀 Spawn the worker. Returns a JoinHandle because we trust but verify. Mostly verify.
    fn start(self) -> JoinHandle<Result<Self::Output>>;
}

/// 📬 What travels down the channel.
///
/// `Finished` is the source saying "that was everything". A channel that closes without
/// it means the source died mid-collection, and the sink must not pretend the run was complete.
#[derive(Debug)]
pub(crate) enum SourceMessage {
    Page(Page),
    Finished,
}

/// 📵 The other end of the channel went away before the conversation was over.
///
/// Never the root cause. Whoever hung up has the real error, and the pipeline reports that one.
#[derive(Debug)]
pub(crate) struct HungUp(pub(crate) &'static str);

impl std::fmt::Display for HungUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "the {} worker hung up before the run was finished", self.0)
    }
}

impl std::error::Error for HungUp {}
