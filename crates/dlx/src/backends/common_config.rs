//! 📦 **Common Sink Config**: the knobs every lake-shaped sink shares.
//!
//! 🧠 Knowledge graph:
//! - Flattened into `S3LakeSinkConfig` and `FileSinkConfig`, so in TOML the keys sit
//!   right next to `bucket` / `root_dir` instead of hiding in a sub-table.
//! - Read by the SinkWorker (part size, JSON style) and by the key layout (prefix).
//! - The in-memory sink has no config and gets `CommonSinkConfig::default()`.
//!
//! "He who puts common config in app_config, creates circular imports in production."
//!   (ancient Rust module proverb) 💀

use serde::Deserialize;

/// 🪣 Shared sink-side configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CommonSinkConfig {
    /// 🗂️ First path segment of every object key. `raw` because that's what's in it.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// ✂️ Split a run into `part-NNNN` objects of at most this many records.
    /// Unset (or 0) means one object per run, however big it gets.
    #[serde(default)]
    pub max_records_per_object: Option<usize>,
    /// 🎨 4-space indented JSON, like the lake has always received. `false` for compact.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_key_prefix() -> String {
    "raw".to_string()
}

fn default_pretty() -> bool {
    true
}

impl CommonSinkConfig {
    /// ✂️ The part size, with 0 folded into "no limit" so nobody writes an infinite number of empty parts.
    pub fn part_size(&self) -> Option<usize> {
        self.max_records_per_object.filter(|n| *n > 0)
    }
}

impl Default for CommonSinkConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            max_records_per_object: None,
            pretty: default_pretty(),
        }
    }
}
