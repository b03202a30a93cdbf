use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::backends::Sink;
use crate::backends::common_config::CommonSinkConfig;

// -- 🚰 FileSinkConfig lives here, cozy next to its FileSink bestie. One backend = one config = one file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileSinkConfig {
    /// 📁 Object keys are resolved under this directory. Created if missing.
    pub root_dir: PathBuf,
    #[serde(flatten, default)]
    pub common_config: CommonSinkConfig,
}

/// 🚰 FileSink: writes each object to `{root_dir}/{key}`, making directories as it goes.
///
/// A very loyal golden retriever. You throw it bytes, it buries them at the exact
/// path you asked for. It does not ask why the path has `year=2024` in it.
///
/// ⚠️ Existing files at the same key are overwritten, exactly like S3 would.
#[derive(Debug)]
pub(crate) struct FileSink {
    sink_config: FileSinkConfig,
    files_written: usize,
}

impl FileSink {
    /// 🚀 Make sure the root exists. Everything below it gets created on demand.
    pub(crate) async fn new(sink_config: FileSinkConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&sink_config.root_dir)
            .await
            .with_context(|| {
                format!(
                    "💀 The lake directory '{}' could not be conjured into existence. \
                     We stared at the path. The path stared back.",
                    sink_config.root_dir.display()
                )
            })?;
        Ok(Self {
            sink_config,
            files_written: 0,
        })
    }

    /// 🗺️ `root_dir` + key, refusing keys that try to climb out of the root.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let stays_inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !stays_inside || key.is_empty() {
            anyhow::bail!("💀 Object key '{key}' does not stay inside the lake directory");
        }
        Ok(self.sink_config.root_dir.join(relative))
    }
}

#[async_trait]
impl Sink for FileSink {
    /// 📡 One object, one file. Parent directories first, then the bytes.
    async fn put_object(&mut self, key: &str, body: Vec<u8>) -> Result<()> {
        let the_path = self.path_for(key)?;
        if let Some(parent) = the_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("💀 Could not create '{}'", parent.display()))?;
        }
        trace!("📬 {} bytes walked into the file sink at {}", body.len(), the_path.display());
        tokio::fs::write(&the_path, body)
            .await
            .with_context(|| format!("💀 Could not write '{}'. The disk has spoken.", the_path.display()))?;
        self.files_written += 1;
        Ok(())
    }

    /// 🗑️ Every write already hit the disk. Nothing buffered, nothing to flush.
    async fn close(&mut self) -> Result<()> {
        debug!(
            "🎬 file sink takes its bow: {} file(s) under {}",
            self.files_written,
            self.sink_config.root_dir.display()
        );
        Ok(())
    }
}
