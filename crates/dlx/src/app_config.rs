//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Layers, lowest to highest:
//! 1. serde defaults (the dev stack: `localhost:9090` API, `localhost:9000` lake)
//! 2. `DLX_*` env vars, nested with `__` (`DLX_RUNTIME__STARTUP_DELAY_SECS=0`)
//! 3. the TOML file, if one was given
//! 4. the two legacy env vars the batch job has always honored: `DATA_BASE_URL`, `S3_ENDPOINT`

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

pub use crate::backends::{
    ApiSourceConfig, CommonSinkConfig, FileSinkConfig, InMemorySourceConfig, S3LakeSinkConfig,
};
pub use crate::retry::RetryConfig;
use crate::common::Entity;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Where the records come from.
    #[serde(default)]
    pub source_config: SourceConfig,
    /// 🪣 Where the records end up.
    #[serde(default)]
    pub sink_config: SinkConfig,
    #[serde(default, alias = "supervisor_config")]
    pub runtime: RuntimeConfig,
    /// 🚰 Which entities to ingest, in order. Defaults to users, then content.
    #[serde(default = "default_pipelines")]
    pub pipelines: Vec<PipelineConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_config: SourceConfig::default(),
            sink_config: SinkConfig::default(),
            runtime: RuntimeConfig::default(),
            pipelines: default_pipelines(),
        }
    }
}

/// 🎭 The source casting call. One variant per way of getting records.
#[derive(Debug, Deserialize, Clone)]
pub enum SourceConfig {
    #[serde(alias = "api")]
    Api(ApiSourceConfig),
    #[serde(alias = "in_memory")]
    InMemory(InMemorySourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Api(ApiSourceConfig::default())
    }
}

/// 🎭 The sink casting call. S3 for real life, File for the airplane, InMemory for tests.
#[derive(Debug, Deserialize, Clone)]
pub enum SinkConfig {
    #[serde(alias = "s3")]
    S3(S3LakeSinkConfig),
    #[serde(alias = "file")]
    File(FileSinkConfig),
    #[serde(alias = "in_memory")]
    InMemory,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::S3(S3LakeSinkConfig::default())
    }
}

impl SinkConfig {
    /// 📦 The shared knobs of whichever sink was picked. InMemory has none, so it gets the defaults.
    pub fn common_config(&self) -> CommonSinkConfig {
        match self {
            Self::S3(s3) => s3.common_config.clone(),
            Self::File(file) => file.common_config.clone(),
            Self::InMemory => CommonSinkConfig::default(),
        }
    }
}

/// ⏱️ Knobs for the supervisor: how long to nap, how deep the channel is, whether to draw bars.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 💤 Seconds to sleep before the first pipeline. The data server and the lake
    /// come up in the same compose file and take their sweet time about it.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
    /// 📬 Pages buffered between source and sink worker before the source waits.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_startup_delay_secs() -> u64 {
    20
}

fn default_queue_capacity() -> usize {
    10
}

fn default_show_progress() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_startup_delay_secs(),
            queue_capacity: default_queue_capacity(),
            show_progress: default_show_progress(),
        }
    }
}

/// 🚰 One pipeline = one entity + what to do to each record on the way through.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
    pub entity: Entity,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// 🔄 The per-record hook. Passthrough by default, because most data is fine the way it is.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransformConfig {
    #[default]
    Passthrough,
    IngestMetadata,
}

fn default_pipelines() -> Vec<PipelineConfig> {
    vec![
        PipelineConfig {
            entity: Entity::Users,
            transform: TransformConfig::default(),
        },
        PipelineConfig {
            entity: Entity::Content,
            transform: TransformConfig::default(),
        },
    ]
}

/// 🏚️ The env vars the batch job answered to before it had a config file. They still win.
pub const DATA_BASE_URL_ENV: &str = "DATA_BASE_URL";
pub const S3_ENDPOINT_ENV: &str = "S3_ENDPOINT";

/// 🚀 Load the config: from a file, from env vars, or from the sheer power of hoping.
///
/// 📐 DESIGN NOTE:
///   - `config_file_name` None → defaults + env vars only.
///   - `config_file_name` Some → defaults + env vars + TOML file, TOML wins on conflicts.
///   - `DATA_BASE_URL` / `S3_ENDPOINT` are applied last, onto whichever backend was picked.
///
/// 💀 Returns an error if config is unparseable, with a message that says which layer to blame.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("DLX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (DLX_*). \
             One of them is lying. The file is the usual suspect.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (DLX_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    Ok(apply_legacy_env(app_config, |key| std::env::var(key).ok()))
}

/// 🏚️ Lay `DATA_BASE_URL` and `S3_ENDPOINT` over the extracted config.
///
/// Takes a lookup fn instead of reading the process env directly so tests don't have to
/// mutate global state. Empty values are treated as unset, same as the old job did.
pub(crate) fn apply_legacy_env<F>(mut app_config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let (SourceConfig::Api(api), Some(url)) =
        (&mut app_config.source_config, non_empty(DATA_BASE_URL_ENV))
    {
        api.base_url = url;
    }
    if let (SinkConfig::S3(s3), Some(endpoint)) =
        (&mut app_config.sink_config, non_empty(S3_ENDPOINT_ENV))
    {
        s3.endpoint_url = endpoint;
    }
    app_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut the_file = tempfile::Builder::new()
            .prefix("dlx_app_config_")
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create a temp config. The filesystem said 'new phone who dis'.");
        the_file
            .write_all(contents.as_bytes())
            .expect("💀 Failed to write test config.");
        the_file
    }

    #[test]
    fn the_one_where_an_empty_world_still_points_at_the_dev_stack() {
        let app_config: AppConfig = Figment::new()
            .extract()
            .expect("💀 Defaults alone should be a valid config.");

        match &app_config.source_config {
            SourceConfig::Api(api) => {
                assert_eq!(api.base_url, "http://localhost:9090/api/");
                assert_eq!(api.page_limit, 200);
            }
            other => panic!("💀 Expected the Api source by default, got {other:?}"),
        }
        match &app_config.sink_config {
            SinkConfig::S3(s3) => {
                assert_eq!(s3.bucket, "datalake");
                assert_eq!(s3.endpoint_url, "http://localhost:9000");
                assert!(s3.force_path_style);
            }
            other => panic!("💀 Expected the S3 sink by default, got {other:?}"),
        }
        assert_eq!(app_config.runtime, RuntimeConfig::default());
        assert_eq!(app_config.runtime.startup_delay_secs, 20);
        let the_entities: Vec<Entity> = app_config.pipelines.iter().map(|p| p.entity).collect();
        assert_eq!(the_entities, vec![Entity::Users, Entity::Content]);
    }

    #[test]
    fn the_one_where_the_toml_file_gets_the_last_word() {
        let the_file = write_test_config(
            r#"
            [runtime]
            startup_delay_secs = 0
            queue_capacity = 3

            [source_config.Api]
            base_url = "http://data-server:9090/api"
            page_limit = 50

            [sink_config.File]
            root_dir = "/tmp/lake"
            key_prefix = "bronze"

            [[pipelines]]
            entity = "content"
            transform = "ingest_metadata"
            "#,
        );

        let app_config = load_config(Some(the_file.path()))
            .expect("💀 A perfectly reasonable TOML file was rejected.");

        assert_eq!(app_config.runtime.startup_delay_secs, 0);
        assert_eq!(app_config.runtime.queue_capacity, 3);
        match &app_config.source_config {
            SourceConfig::Api(api) => assert_eq!(api.page_limit, 50),
            other => panic!("💀 Expected Api, got {other:?}"),
        }
        match &app_config.sink_config {
            SinkConfig::File(file) => {
                assert_eq!(file.root_dir, std::path::PathBuf::from("/tmp/lake"));
                assert_eq!(file.common_config.key_prefix, "bronze");
            }
            other => panic!("💀 Expected File, got {other:?}"),
        }
        assert_eq!(
            app_config.pipelines,
            vec![PipelineConfig {
                entity: Entity::Content,
                transform: TransformConfig::IngestMetadata,
            }]
        );
    }

    #[test]
    fn the_one_where_runtime_accepts_its_former_stage_names() {
        let the_file = write_test_config(
            r#"
            [supervisor_config]
            channel_size = 12
            "#,
        );

        let app_config = load_config(Some(the_file.path()))
            .expect("💀 Runtime aliases should parse.");
        assert_eq!(app_config.runtime.queue_capacity, 12);
    }

    #[test]
    fn the_one_where_a_typo_in_the_entity_name_is_not_tolerated() {
        let the_file = write_test_config(
            r#"
            [[pipelines]]
            entity = "userz"
            "#,
        );
        assert!(load_config(Some(the_file.path())).is_err());
    }

    #[test]
    fn the_one_where_the_legacy_env_vars_still_run_the_show() {
        let the_env = |key: &str| match key {
            "DATA_BASE_URL" => Some("http://data-server:9090/api/".to_string()),
            "S3_ENDPOINT" => Some("http://minio:9000".to_string()),
            _ => None,
        };
        let app_config = apply_legacy_env(AppConfig::default(), the_env);

        match &app_config.source_config {
            SourceConfig::Api(api) => assert_eq!(api.base_url, "http://data-server:9090/api/"),
            other => panic!("💀 Expected Api, got {other:?}"),
        }
        match &app_config.sink_config {
            SinkConfig::S3(s3) => assert_eq!(s3.endpoint_url, "http://minio:9000"),
            other => panic!("💀 Expected S3, got {other:?}"),
        }
    }

    #[test]
    fn the_one_where_blank_legacy_vars_count_as_not_being_there() {
        let app_config = apply_legacy_env(AppConfig::default(), |_| Some("  ".to_string()));
        match &app_config.source_config {
            SourceConfig::Api(api) => assert_eq!(api.base_url, "http://localhost:9090/api/"),
            other => panic!("💀 Expected Api, got {other:?}"),
        }
    }
}
