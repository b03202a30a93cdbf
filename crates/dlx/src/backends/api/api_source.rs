//! 📡🚰 API Source: walking the data server one page at a time.
//!
//! COLD OPEN. EXT. LOCALHOST:9090, 3:47 AM
//!
//! "Give me everyone," said the pipeline. "Two hundred at a time," said the server.
//! "And after that?" "Come back at offset two hundred." And so it went, fifty times,
//! until the server said `has_more: false` and the pipeline finally went home.
//!
//! This module implements `Source` for the data server's JSON collections. It is
//! generic over the [`Envelope`] so the same cursor loop serves both the paginated
//! `/users` and the all-at-once `/content`.

use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::backends::Source;
use crate::common::{Entity, Envelope, Page};
use crate::retry::{AttemptError, RetryConfig, with_retry};

/// 📏 The data server refuses to hand out more than this many records per page.
pub const MAX_PAGE_LIMIT: u32 = 200;

// ============================================================
//  🔧 ApiSourceConfig
// ============================================================

/// 🔧 Configuration for the data server source.
///
/// `base_url` may or may not end in `/`. We fix it either way. Nobody should have to
/// remember whether the API wants a trailing slash. Not at 3am. Not ever.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiSourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 📏 Records per page for paginated entities. Clamped to `1..=200`.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    "http://localhost:9090/api/".to_string()
}

fn default_page_limit() -> u32 {
    MAX_PAGE_LIMIT
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ApiSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_limit: default_page_limit(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl ApiSourceConfig {
    pub fn effective_page_limit(&self) -> u32 {
        self.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }
}

/// 🔗 `{base}/{entity}`, whatever the base URL thinks about trailing slashes.
pub(crate) fn endpoint_url(base_url: &str, entity: Entity) -> Result<Url> {
    let mut base = Url::parse(base_url.trim()).with_context(|| {
        format!("💀 '{base_url}' is not a URL. It's barely a string. Check source_config.Api.base_url or DATA_BASE_URL.")
    })?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(entity.path())
        .with_context(|| format!("💀 Could not glue '{}' onto '{base_url}'", entity.path()))
}

// ============================================================
//  🚰 ApiSource
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    At(u64),
    Exhausted,
}

/// 🚰 Pages through one entity's endpoint until the envelope says there is nothing left.
pub(crate) struct ApiSource<E: Envelope> {
    client: reqwest::Client,
    entity: Entity,
    endpoint: Url,
    config: ApiSourceConfig,
    cursor: Cursor,
    _envelope: PhantomData<fn() -> E>,
}

impl<E: Envelope> std::fmt::Debug for ApiSource<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSource")
            .field("entity", &self.entity)
            .field("endpoint", &self.endpoint.as_str())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<E: Envelope> ApiSource<E> {
    /// 🚀 Builds the HTTP client and resolves the endpoint. No requests yet. We are polite.
    pub(crate) fn new(entity: Entity, config: ApiSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("💀 The HTTP client refused to be born. The TLS stack wept.")?;
        let endpoint = endpoint_url(&config.base_url, entity)?;
        debug!("📡 {} source pointed at {}", entity, endpoint);

        Ok(Self {
            client,
            entity,
            endpoint,
            config,
            cursor: Cursor::At(0),
            _envelope: PhantomData,
        })
    }

    fn page_url(&self, offset: u64) -> Url {
        let mut url = self.endpoint.clone();
        if self.entity.is_paginated() {
            url.query_pairs_mut()
                .append_pair("offset", &offset.to_string())
                .append_pair("limit", &self.config.effective_page_limit().to_string());
        }
        url
    }
}

/// 📡 One GET, one envelope. Sorts failures into "try again" and "don't bother".
async fn fetch_envelope<E: Envelope>(
    client: &reqwest::Client,
    url: Url,
) -> std::result::Result<E, AttemptError> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_builder() {
            AttemptError::Permanent(e.into())
        } else {
            // -- timeouts, refused connections, resets. the network's way of saying "later".
            AttemptError::Transient(e.into())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = anyhow::anyhow!("data server answered {status}: {body}");
        let worth_another_try = status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT;
        return Err(if worth_another_try {
            AttemptError::Transient(error)
        } else {
            AttemptError::Permanent(error)
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| AttemptError::Transient(anyhow::Error::new(e).context("response body cut off mid-stream")))?;
    serde_json::from_str::<E>(&body).map_err(|e| {
        AttemptError::Permanent(
            anyhow::Error::new(e).context("💀 response body does not look like the documented envelope"),
        )
    })
}

#[async_trait]
impl<E: Envelope> Source for ApiSource<E> {
    /// 📄 Fetch the next page. `None` once the envelope has said its last word.
    ///
    /// 🧠 Exit conditions:
    ///   1. whole-collection entity: after the single response.
    ///   2. paginated entity: `has_more == false` or `next_offset == -1`.
    ///   3. a page that claims more but does not move the offset forward is an error,
    ///      not an invitation to loop forever.
    async fn next_page(&mut self) -> Result<Option<Page>> {
        let offset = match self.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::At(offset) => offset,
        };

        let url = self.page_url(offset);
        let what = format!("GET {url}");
        let client = &self.client;
        let envelope: E = with_retry(&self.config.retry, &what, || fetch_envelope::<E>(client, url.clone()))
            .await
            .with_context(|| format!("💀 Fetching {} at offset {offset} failed", self.entity))?;

        let claimed = envelope.count();
        let total = envelope.total();
        let page_offset = envelope.offset();
        self.cursor = match envelope.next_offset() {
            Some(next) if next <= page_offset => anyhow::bail!(
                "💀 {} page at offset {page_offset} says the next page is at {next}. \
                 That's not forward. We refuse to ride this carousel.",
                self.entity
            ),
            // -- the server answers 400 to any offset past the end. don't ask it.
            Some(next) if next >= total => anyhow::bail!(
                "💀 {} page at offset {page_offset} points past the end: next offset {next}, total {total}",
                self.entity
            ),
            Some(next) => Cursor::At(next),
            None => Cursor::Exhausted,
        };

        let records = envelope.into_records();
        if claimed != records.len() as u64 {
            warn!(
                "⚠️ {} page at offset {page_offset} claims {claimed} records but carried {}",
                self.entity,
                records.len()
            );
        }
        trace!(
            "📄 {} page at offset {page_offset}: {} records ({} total), next cursor {:?}",
            self.entity,
            records.len(),
            total,
            self.cursor
        );

        Ok(Some(Page::from_records(records, Some(total))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ContentEnvelope, UsersEnvelope};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn users_page(offset: u64, ids: std::ops::Range<u64>, total: u64, limit: u64) -> serde_json::Value {
        let users: Vec<_> = ids
            .map(|i| {
                json!({
                    "user_id": format!("user_{i}"),
                    "age": 30,
                    "status": "free",
                    "country": "US",
                    "created_at": "2023-05-05T00:00:00Z"
                })
            })
            .collect();
        let end = offset + users.len() as u64;
        let has_more = end < total;
        let next_offset: i64 = if has_more { end as i64 } else { -1 };
        json!({
            "users": users,
            "count": users.len(),
            "total_users": total,
            "offset": offset,
            "limit": limit,
            "has_more": has_more,
            "next_offset": next_offset,
        })
    }

    fn test_config(server: &MockServer) -> ApiSourceConfig {
        ApiSourceConfig {
            // -- no trailing slash on purpose. endpoint_url has to earn its keep.
            base_url: format!("{}/api", server.uri()),
            page_limit: 2,
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 2,
                backoff_multiplier: 2.0,
                jitter: false,
            },
            ..ApiSourceConfig::default()
        }
    }

    #[test]
    fn the_one_where_trailing_slashes_stop_mattering() -> Result<()> {
        assert_eq!(
            endpoint_url("http://localhost:9090/api/", Entity::Users)?.as_str(),
            "http://localhost:9090/api/users"
        );
        assert_eq!(
            endpoint_url("http://localhost:9090/api", Entity::Content)?.as_str(),
            "http://localhost:9090/api/content"
        );
        assert_eq!(
            endpoint_url("http://localhost:9090", Entity::Users)?.as_str(),
            "http://localhost:9090/users"
        );
        assert!(endpoint_url("not a url", Entity::Users).is_err());
        Ok(())
    }

    #[test]
    fn the_one_where_greedy_page_limits_get_clamped() {
        let greedy = ApiSourceConfig {
            page_limit: 1_000,
            ..ApiSourceConfig::default()
        };
        assert_eq!(greedy.effective_page_limit(), 200);
        let shy = ApiSourceConfig {
            page_limit: 0,
            ..ApiSourceConfig::default()
        };
        assert_eq!(shy.effective_page_limit(), 1);
    }

    #[tokio::test]
    async fn the_one_where_users_are_walked_page_by_page_until_the_end() -> Result<()> {
        let server = MockServer::start().await;
        for (offset, ids) in [(0u64, 1..3u64), (2, 3..5), (4, 5..6)] {
            Mock::given(method("GET"))
                .and(path("/api/users"))
                .and(query_param("offset", offset.to_string()))
                .and(query_param("limit", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(users_page(offset, ids, 5, 2)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut source = ApiSource::<UsersEnvelope>::new(Entity::Users, test_config(&server))?;
        let mut the_user_ids = Vec::new();
        while let Some(page) = source.next_page().await? {
            assert_eq!(page.total, Some(5));
            for record in page.records {
                the_user_ids.push(record["user_id"].as_str().unwrap_or_default().to_string());
            }
        }

        assert_eq!(the_user_ids, vec!["user_1", "user_2", "user_3", "user_4", "user_5"]);
        // -- exhausted means exhausted. no sneaky extra request.
        assert!(source.next_page().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_content_comes_in_one_trip_without_query_params() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/content"))
            .and(query_param_is_missing("offset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 2,
                "total_content": 2,
                "content": [
                    {"content_id": "content_1", "prayer_type": "rosary", "media_type": "video", "created_at": "2024-01-02T00:00:00Z"},
                    {"content_id": "content_2", "prayer_type": "podcast", "media_type": "text", "created_at": "2024-07-09T00:00:00Z"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = ApiSource::<ContentEnvelope>::new(Entity::Content, test_config(&server))?;
        let the_page = source.next_page().await?.expect("💀 content should produce exactly one page");
        assert_eq!(the_page.len(), 2);
        assert_eq!(the_page.records[1]["prayer_type"], "podcast");
        assert!(source.next_page().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_503_is_shrugged_off_by_the_retry_loop() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service temporarily unavailable"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(users_page(0, 1..2, 1, 2)))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = ApiSource::<UsersEnvelope>::new(Entity::Users, test_config(&server))?;
        let the_page = source.next_page().await?.expect("💀 the retry should have rescued this page");
        assert_eq!(the_page.len(), 1);
        assert!(source.next_page().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_429_just_means_wait_a_moment() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(users_page(0, 1..2, 1, 2)))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = ApiSource::<UsersEnvelope>::new(Entity::Users, test_config(&server))?;
        let the_page = source.next_page().await?.expect("💀 the 429 should have been waited out");
        assert_eq!(the_page.records[0]["user_id"], "user_1");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_sleepy_server_gets_a_second_chance() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/content"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(2_500)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 0,
                "total_content": 0,
                "content": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiSourceConfig {
            request_timeout_secs: 1,
            ..test_config(&server)
        };
        let mut source = ApiSource::<ContentEnvelope>::new(Entity::Content, config)?;
        let the_page = source.next_page().await?.expect("💀 the timeout should have been retried");
        assert!(the_page.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_400_is_taken_at_its_word() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid offset"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = ApiSource::<UsersEnvelope>::new(Entity::Users, test_config(&server))?;
        let the_error = source.next_page().await.expect_err("💀 a 400 should not be a page");
        assert!(format!("{the_error:#}").contains("Invalid offset"));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_server_keeps_saying_page_zero_and_we_leave() -> Result<()> {
        let server = MockServer::start().await;
        let mut the_stuck_page = users_page(0, 1..3, 10, 2);
        the_stuck_page["next_offset"] = json!(0);
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(the_stuck_page))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = ApiSource::<UsersEnvelope>::new(Entity::Users, test_config(&server))?;
        assert!(source.next_page().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_next_offset_points_off_the_edge_and_we_stay_put() -> Result<()> {
        let server = MockServer::start().await;
        let mut the_overreach = users_page(0, 1..3, 4, 2);
        the_overreach["next_offset"] = json!(4);
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(the_overreach))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .and(query_param("offset", "4"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid offset"})))
            .expect(0)
            .mount(&server)
            .await;

        let mut source = ApiSource::<UsersEnvelope>::new(Entity::Users, test_config(&server))?;
        let the_error = source.next_page().await.expect_err("💀 offset 4 of 4 is past the end");
        assert!(format!("{the_error:#}").contains("points past the end"));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_malformed_envelope_is_not_retried() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"surprise\": true}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = ApiSource::<ContentEnvelope>::new(Entity::Content, test_config(&server))?;
        assert!(source.next_page().await.is_err());
        Ok(())
    }
}
