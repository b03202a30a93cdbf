//! 🌊 dlx: batch ingestion from the data server into the lake.
//!
//! 🎬 *[narrator voice]* "Every night, ten thousand users and a thousand pieces of content
//! leave the data server. Every morning, they are sitting in a bucket called `datalake`,
//! partitioned by day, wrapped in JSON arrays. This is how they get there."
//!
//! ```text
//! Supervisor ── per entity ──▶ Pipeline
//!                               SourceWorker ─▶ channel ─▶ SinkWorker
//!                               (API pages)               (transform → compose → PutObject)
//! ```
//!
//! Library callers build an [`AppConfig`](app_config::AppConfig) (or
//! [`load_config`](app_config::load_config) one) and hand it to [`run`] or a [`Supervisor`]. 🦆

pub mod app_config;
pub mod common;

mod backends;
mod composers;
mod layout;
mod progress;
mod retry;
mod supervisors;
mod transforms;

pub use progress::summary_table;
pub use supervisors::{PipelineOutcome, PipelineReport, RunSummary, Supervisor};
pub use transforms::RecordTransformFn;

use app_config::AppConfig;

/// 🚀 Run every configured pipeline. `on_finished` hears about each one as it ends.
pub async fn run<F>(app_config: AppConfig, on_finished: F) -> RunSummary
where
    F: FnMut(&PipelineOutcome),
{
    Supervisor::new(app_config).run_all(on_finished).await
}
