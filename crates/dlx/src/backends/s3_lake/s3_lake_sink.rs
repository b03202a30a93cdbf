//! 🪣📤 S3 Lake Sink: one PutObject per rendered JSON array.
//!
//! COLD OPEN. INT. THE LAKE, DAWN
//!
//! The body arrives already rendered. The key arrives already laid out. All that
//! is left is the part where we hand both to S3 and hope the credentials are the
//! ones from the compose file. They usually are. They are `adminuser`/`admin123`.
//! Nobody is proud of this.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::backends::Sink;
use crate::backends::common_config::CommonSinkConfig;

// ============================================================
//  🔧 S3LakeSinkConfig
// ============================================================

/// 🔧 Where the lake is and how to get in.
///
/// Defaults are the local dev stack. Blank `endpoint_url` means "the real AWS endpoint
/// for `region`". Blank credentials mean "use the SDK's default provider chain", which
/// is what anyone outside the compose file should be doing anyway.
#[derive(Deserialize, Clone, PartialEq)]
pub struct S3LakeSinkConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_access_key_id")]
    pub access_key_id: String,
    #[serde(default = "default_secret_access_key")]
    pub secret_access_key: String,
    /// 🛣️ `http://host/bucket/key` instead of `http://bucket.host/key`. MinIO insists.
    #[serde(default = "default_true")]
    pub force_path_style: bool,
    /// 🔍 HeadBucket on startup, so a missing bucket fails before we fetch 10,000 users.
    #[serde(default = "default_true")]
    pub verify_bucket: bool,
    #[serde(flatten, default)]
    pub common_config: CommonSinkConfig,
}

fn default_bucket() -> String {
    "datalake".to_string()
}

fn default_endpoint_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_region() -> String {
    // -- 🏖️ If you don't choose a region, the region chooses you. And it chose Virginia.
    "us-east-1".to_string()
}

fn default_access_key_id() -> String {
    "adminuser".to_string()
}

fn default_secret_access_key() -> String {
    "admin123".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for S3LakeSinkConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            endpoint_url: default_endpoint_url(),
            region: default_region(),
            access_key_id: default_access_key_id(),
            secret_access_key: default_secret_access_key(),
            force_path_style: true,
            verify_bucket: true,
            common_config: CommonSinkConfig::default(),
        }
    }
}

// 🔒 Hand-rolled so the secret never lands in a log line. Even the dev one. Habits matter.
impl std::fmt::Debug for S3LakeSinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3LakeSinkConfig")
            .field("bucket", &self.bucket)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("force_path_style", &self.force_path_style)
            .field("verify_bucket", &self.verify_bucket)
            .field("common_config", &self.common_config)
            .finish()
    }
}

impl S3LakeSinkConfig {
    fn static_credentials(&self) -> Option<Credentials> {
        if self.access_key_id.trim().is_empty() || self.secret_access_key.trim().is_empty() {
            return None;
        }
        Some(Credentials::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            None,
            None,
            "dlx-static",
        ))
    }
}

// ============================================================
//  🪣 S3LakeSink
// ============================================================

/// 🪣 Puts rendered objects into the bucket. No buffering, no multipart, no drama.
pub(crate) struct S3LakeSink {
    client: aws_sdk_s3::Client,
    sink_config: S3LakeSinkConfig,
    objects_written: usize,
}

impl std::fmt::Debug for S3LakeSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3LakeSink")
            .field("sink_config", &self.sink_config)
            .field("objects_written", &self.objects_written)
            .finish()
    }
}

impl S3LakeSink {
    /// 🚀 Build the S3 client and, unless told otherwise, make sure the bucket is really there.
    ///
    /// 💀 Fails if the bucket check fails: wrong endpoint, wrong credentials, or a lake
    /// that has not finished waking up yet.
    pub(crate) async fn new(sink_config: S3LakeSinkConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(sink_config.region.clone()));
        if !sink_config.endpoint_url.trim().is_empty() {
            loader = loader.endpoint_url(sink_config.endpoint_url.trim());
        }
        if let Some(credentials) = sink_config.static_credentials() {
            loader = loader.credentials_provider(credentials);
        }
        let the_sdk_config = loader.load().await;

        let the_s3_config = aws_sdk_s3::config::Builder::from(&the_sdk_config)
            .force_path_style(sink_config.force_path_style)
            .build();
        let client = aws_sdk_s3::Client::from_conf(the_s3_config);

        if sink_config.verify_bucket {
            client
                .head_bucket()
                .bucket(&sink_config.bucket)
                .send()
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "💀 HeadBucket on '{}' at '{}' failed: {}. \
                         Either the bucket does not exist, the credentials are wrong, \
                         or the lake is still brushing its teeth.",
                        sink_config.bucket,
                        sink_config.endpoint_url,
                        DisplayErrorContext(&e)
                    )
                })?;
            debug!("🪣 bucket '{}' answered the door", sink_config.bucket);
        }

        Ok(Self {
            client,
            sink_config,
            objects_written: 0,
        })
    }
}

#[async_trait]
impl Sink for S3LakeSink {
    /// 📤 PutObject `body` at `key`, as `application/json`. Overwrites are S3's default and ours.
    async fn put_object(&mut self, key: &str, body: Vec<u8>) -> Result<()> {
        let the_size = body.len();
        trace!("📤 PUT s3://{}/{} ({} bytes)", self.sink_config.bucket, key, the_size);

        self.client
            .put_object()
            .bucket(&self.sink_config.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
            .with_context(|| {
                format!(
                    "💀 PutObject s3://{}/{} failed. The body was ready. The lake was not.",
                    self.sink_config.bucket, key
                )
            })?;

        self.objects_written += 1;
        info!("📤 uploaded s3://{}/{} ({} bytes)", self.sink_config.bucket, key, the_size);
        Ok(())
    }

    /// 🗑️ The SDK client owns nothing we need to flush. We just say goodbye.
    async fn close(&mut self) -> Result<()> {
        debug!(
            "🪣 S3 lake sink closing after {} object(s) into '{}'",
            self.objects_written, self.sink_config.bucket
        );
        Ok(())
    }
}
