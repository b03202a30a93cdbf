//! 🪣🌊 S3 Lake Backend: the landing zone.
//!
//! EXT. MINIO CONTAINER, PORT 9000. A bucket called `datalake` waits, empty and full of
//! potential, like a notebook on the first day of school. Our job is to fill it with
//! JSON arrays and never, ever, write in the margins.
//!
//! 🧠 Knowledge graph:
//! - Config co-located: `S3LakeSinkConfig` lives in `s3_lake_sink.rs`
//! - Trait impl: `impl Sink for S3LakeSink`
//! - Enum variant: `SinkBackend::S3(S3LakeSink)`
//! - Transport: AWS SDK `PutObject`, `ByteStream` body, `application/json`
//! - Works against anything that speaks S3: MinIO locally, the real thing elsewhere

mod s3_lake_sink;

pub(crate) use s3_lake_sink::S3LakeSink;
pub use s3_lake_sink::S3LakeSinkConfig;
