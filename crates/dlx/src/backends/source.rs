use anyhow::Result;
use async_trait::async_trait;

use crate::app_config::SourceConfig;
use crate::backends::{api, in_mem};
use crate::common::{ContentEnvelope, Entity, Page, UsersEnvelope};

/// 🚰 A source that produces one page of records per call.
///
/// # Contract 📜
/// - `next_page` returns `Ok(Some(page))` while there is data, `Ok(None)` once the collection is exhausted.
/// - After `Ok(None)`, it keeps returning `Ok(None)`. No zombie pages.
/// - `Err(...)` means the fetch failed after whatever retrying the source does on its own.
/// - `&mut self` because sources have a cursor. And feelings. Mostly a cursor.
#[async_trait]
pub(crate) trait Source: std::fmt::Debug + Send {
    async fn next_page(&mut self) -> Result<Option<Page>>;
}

/// 🎭 The many faces of a Source. The API gets one variant per envelope shape,
/// because `/users` and `/content` wrap their records differently.
#[derive(Debug)]
pub(crate) enum SourceBackend {
    Users(api::ApiSource<UsersEnvelope>),
    Content(api::ApiSource<ContentEnvelope>),
    InMemory(in_mem::InMemorySource),
}

impl SourceBackend {
    /// 🏗️ Resolve the source for `entity` from config.
    pub(crate) fn from_config(entity: Entity, source_config: &SourceConfig) -> Result<Self> {
        Ok(match source_config {
            SourceConfig::Api(api_config) => match entity {
                Entity::Users => Self::Users(api::ApiSource::new(entity, api_config.clone())?),
                Entity::Content => Self::Content(api::ApiSource::new(entity, api_config.clone())?),
            },
            SourceConfig::InMemory(in_mem_config) => {
                Self::InMemory(in_mem::InMemorySource::sample(entity, in_mem_config)?)
            }
        })
    }
}

#[async_trait]
impl Source for SourceBackend {
    async fn next_page(&mut self) -> Result<Option<Page>> {
        match self {
            SourceBackend::Users(s) => s.next_page().await,
            SourceBackend::Content(s) => s.next_page().await,
            SourceBackend::InMemory(s) => s.next_page().await,
        }
    }
}
