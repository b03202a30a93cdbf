//! 🚀 dlx-cli: the front door, the bouncer, the maitre d' of dlx.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config, sets up logging,
//! and then lets the library do the heavy lifting. Like a manager. 🦆

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use dlx::{PipelineOutcome, RunSummary};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 🔧 Picked up from the working directory when no path is given.
const DEFAULT_CONFIG_FILE: &str = "dlx.toml";

/// 🚀 main(): where it all begins.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Find the config file, if there is one
/// 3. Load config (the moment of truth)
/// 4. Run every pipeline, announcing each as it lands
/// 5. Summarize, and exit non-zero if anything failed
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 `RUST_LOG` wins. Otherwise, info. println! debugging is a lifestyle we're moving past.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_file = resolve_config_file(std::env::args().nth(1))?;

    // 🔧 Load the config. This is where we find out if someone put a tab where a space should be.
    let app_config = dlx::app_config::load_config(config_file.as_deref()).context(
        "💀 In dlx-cli, main, we couldn't load the configuration. Take a look at the file and the \
         DLX_* / DATA_BASE_URL / S3_ENDPOINT environment variables.",
    )?;

    // 🚀 SEND IT.
    let summary = dlx::run(app_config, announce).await;

    println!("{}", dlx::summary_table(&summary));

    if !summary.all_succeeded() {
        report_failures(&summary);
        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }

    // ✅ Pop the champagne. 🍾
    Ok(())
}

/// 🗂️ Arg 1 is the config path and must exist. Without it, `dlx.toml` is used if present,
/// and env vars alone otherwise.
fn resolve_config_file(arg: Option<String>) -> Result<Option<std::path::PathBuf>> {
    match arg {
        Some(path_arg) => {
            let config_file = Path::new(&path_arg);
            let exists = config_file.try_exists().with_context(|| {
                format!(
                    "💀 Couldn't check whether '{}' exists. Permissions, probably. It's always permissions.",
                    config_file.display()
                )
            })?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' does not exist. If it's a relative path, remember it's \
                     relative to where you ran this from, not where the binary lives.",
                    config_file.display()
                );
            }
            Ok(Some(config_file.to_path_buf()))
        }
        None => {
            let default_file = Path::new(DEFAULT_CONFIG_FILE);
            if default_file.try_exists().unwrap_or(false) {
                Ok(Some(default_file.to_path_buf()))
            } else {
                info!("🔧 no {} here, running on defaults and environment variables", DEFAULT_CONFIG_FILE);
                Ok(None)
            }
        }
    }
}

/// 🚰 The line the batch job has always printed when an entity lands.
fn announce(outcome: &PipelineOutcome) {
    if let PipelineOutcome::Completed(report) = outcome {
        println!(
            "🚰 `{}` batch pipelines completed at {}",
            report.entity,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
    }
}

/// 💀 Peel the onion of sadness, one layer at a time, and guess whether it was the network.
fn report_failures(summary: &RunSummary) {
    let mut the_vibes_are_giving_connection_issues = false;
    for (entity, err) in summary.failures() {
        error!("💀 {} pipeline error: {}", entity, err);
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dispatch failure")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }
    }

    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: looks like the data server or the lake isn't reachable. \
             Check DATA_BASE_URL and S3_ENDPOINT, and if you're using Docker, \
             `docker compose ps` to see who's up. Even servers need a nudge sometimes. ☕"
        );
    }
}
