//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Sources pour records out of the data server, Sinks drop JSON objects into the lake.
//! And in between, we panic! (kidding, we use anyhow)
//!
//! 🎭 Same shape everywhere: trait → concrete impls → enum dispatcher → `from_config`.
//! Configs live next to the backend they configure, and get re-exported here so
//! callers can write `backends::S3LakeSinkConfig` instead of spelunking. 🦆

pub(crate) mod api;
pub(crate) mod common_config;
pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod s3_lake;
mod sink;
mod source;

pub(crate) use sink::{Sink, SinkBackend};
pub(crate) use source::{Source, SourceBackend};

pub use api::ApiSourceConfig;
pub use common_config::CommonSinkConfig;
pub use file::FileSinkConfig;
pub use in_mem::InMemorySourceConfig;
pub use s3_lake::S3LakeSinkConfig;
