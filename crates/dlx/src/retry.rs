//! 🔄 Retry: because the data server is having a day, and so are we.
//!
//! 🎬 *[a GET request leaves the building. a 503 comes back. the request sighs and tries again.]*
//!
//! Exponential backoff with optional ±30% jitter. Failures are sorted into two bins:
//! - [`AttemptError::Transient`]: timeouts, refused connections, 429s, 5xx. Worth another shot.
//! - [`AttemptError::Permanent`]: 4xx, garbage JSON. Retrying these is just arguing with a wall.
//!
//! 🦆 The duck retries nothing. The duck commits.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

/// 🔧 Knobs for the backoff loop. Lives in config under `[source_config.Api.retry]`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// 🔁 Retries on top of the first attempt. 3 means up to 4 requests total.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// 🎲 ±30% noise on every sleep, so a fleet of retries doesn't stampede in lockstep.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// ⏱️ Base delay before retry number `attempt` (1-based), without jitter.
    ///
    /// `initial * multiplier^(attempt - 1)`, capped at `max_backoff_ms`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let the_millis = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let the_capped_millis = the_millis.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(the_capped_millis as u64)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.backoff_for(attempt);
        if !self.jitter {
            return base;
        }
        // -- 🎲 ±30%. the dice are fair. the network is not.
        let factor = 1.0 + rand::thread_rng().gen_range(-0.3..0.3);
        Duration::from_millis((base.as_millis() as f64 * factor) as u64)
    }
}

/// 🗂️ How an attempt failed, and therefore whether it deserves another one.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Transient(anyhow::Error),
    Permanent(anyhow::Error),
}

/// 🔄 Run `op` until it succeeds, fails permanently, or runs out of retries.
///
/// `what` names the operation in logs and in the final error context, e.g. `"GET /users?offset=400"`.
pub(crate) async fn with_retry<T, F, Fut>(config: &RetryConfig, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Permanent(e)) => {
                return Err(e).context(format!("💀 {what} failed and it is not the retrying kind of failure"));
            }
            Err(AttemptError::Transient(e)) => {
                attempt += 1;
                if attempt > config.max_retries {
                    return Err(e).context(format!(
                        "💀 {what} still failing after {} retries. We knocked. We waited. We knocked louder.",
                        config.max_retries
                    ));
                }
                let delay = config.delay_for(attempt);
                warn!(
                    "🔄 {} failed ({:#}), retry {}/{} in {:?}",
                    what, e, attempt, config.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn the_one_where_backoff_doubles_until_it_hits_the_ceiling() {
        let config = RetryConfig {
            max_retries: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
        assert_eq!(config.backoff_for(5), Duration::from_millis(1_000));
        assert_eq!(config.backoff_for(9), Duration::from_millis(1_000));
    }

    #[test]
    fn the_one_where_jitter_stays_inside_its_thirty_percent_lane() {
        let config = RetryConfig {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 1_000,
            ..RetryConfig::default()
        };
        for _ in 0..100 {
            let the_delay = config.delay_for(1).as_millis();
            assert!((700..=1_300).contains(&the_delay), "jitter went rogue: {the_delay}ms");
        }
    }

    #[tokio::test]
    async fn the_one_where_transient_failures_eventually_give_way() -> Result<()> {
        let the_attempts = Arc::new(AtomicU32::new(0));
        let counter = the_attempts.clone();
        let the_answer = with_retry(&fast_config(3), "flaky op", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AttemptError::Transient(anyhow::anyhow!("503")))
                } else {
                    Ok(42)
                }
            }
        })
        .await?;
        assert_eq!(the_answer, 42);
        assert_eq!(the_attempts.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_permanent_failures_do_not_get_a_second_date() {
        let the_attempts = Arc::new(AtomicU32::new(0));
        let counter = the_attempts.clone();
        let the_result: Result<()> = with_retry(&fast_config(5), "doomed op", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Permanent(anyhow::anyhow!("400 Bad Request")))
            }
        })
        .await;
        assert!(the_result.is_err());
        assert_eq!(the_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn the_one_where_retries_run_out_and_the_last_error_survives() {
        let the_attempts = Arc::new(AtomicU32::new(0));
        let counter = the_attempts.clone();
        let the_result: Result<()> = with_retry(&fast_config(2), "stubborn op", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Transient(anyhow::anyhow!("connection refused")))
            }
        })
        .await;
        let the_error = the_result.expect_err("three strikes should be an error");
        assert_eq!(the_attempts.load(Ordering::SeqCst), 3);
        assert!(format!("{the_error:#}").contains("connection refused"));
    }
}
