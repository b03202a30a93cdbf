use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::SinkConfig;
use crate::backends::{file, in_mem, s3_lake};

/// 🕳️ A sink that stores fully rendered objects. Pure I/O, zero logic.
///
/// Sinks do not buffer, do not transform, do not pick keys. The SinkWorker hands them
/// a key and a body and they put it somewhere. Like a postal worker who delivers the
/// mail without reading it.
///
/// # Contract 📜
/// - `put_object` stores `body` under `key`, overwriting whatever was there.
/// - `close` releases whatever the sink holds. MUST be called. Skipping it is rude.
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug + Send {
    async fn put_object(&mut self, key: &str, body: Vec<u8>) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// 🎭 The many faces of a Sink. Mirrors `SourceBackend` on the other end of the pipe.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    S3(s3_lake::S3LakeSink),
    File(file::FileSink),
    InMemory(in_mem::InMemorySink),
}

impl SinkBackend {
    /// 🏗️ Resolve the sink from config. Async because the S3 sink checks the bucket on the way in.
    pub(crate) async fn from_config(sink_config: &SinkConfig) -> Result<Self> {
        Ok(match sink_config {
            SinkConfig::S3(s3_config) => Self::S3(s3_lake::S3LakeSink::new(s3_config.clone()).await?),
            SinkConfig::File(file_config) => Self::File(file::FileSink::new(file_config.clone()).await?),
            SinkConfig::InMemory => Self::InMemory(in_mem::InMemorySink::new()),
        })
    }
}

#[async_trait]
impl Sink for SinkBackend {
    async fn put_object(&mut self, key: &str, body: Vec<u8>) -> Result<()> {
        match self {
            SinkBackend::S3(sink) => sink.put_object(key, body).await,
            SinkBackend::File(sink) => sink.put_object(key, body).await,
            SinkBackend::InMemory(sink) => sink.put_object(key, body).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            SinkBackend::S3(sink) => sink.close().await,
            SinkBackend::File(sink) => sink.close().await,
            SinkBackend::InMemory(sink) => sink.close().await,
        }
    }
}
