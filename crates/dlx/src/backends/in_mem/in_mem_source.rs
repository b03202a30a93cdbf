use std::collections::VecDeque;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::backends::Source;
use crate::common::{Content, Country, Entity, MediaType, Page, PrayerType, User, UserStatus};

/// 🔧 How much make-believe to produce.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InMemorySourceConfig {
    /// 🔢 Records per entity.
    #[serde(default = "default_records")]
    pub records: usize,
    /// 📄 Records per page for paginated entities. Whole-collection entities ignore it.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_records() -> usize {
    3
}

fn default_page_size() -> usize {
    2
}

impl Default for InMemorySourceConfig {
    fn default() -> Self {
        Self {
            records: default_records(),
            page_size: default_page_size(),
        }
    }
}

/// 📦 The world's most optimistic data source.
///
/// Holds its pages up front and hands them out one per call, then `None` forever.
/// The pages are shaped exactly like what the API source would produce, so the
/// rest of the pipeline can't tell the difference. Please don't tell it.
#[derive(Debug, Default)]
pub(crate) struct InMemorySource {
    pages: VecDeque<Page>,
}

impl InMemorySource {
    pub(crate) fn from_pages(pages: Vec<Page>) -> Self {
        Self {
            pages: pages.into(),
        }
    }

    /// 🎲 Deterministic fake records for `entity`, paged like the real endpoint pages them.
    ///
    /// An empty collection still yields one empty page, same as the server answering
    /// `"users": []`. The sink side needs to hear about it to upload its `[]`.
    pub(crate) fn sample(entity: Entity, config: &InMemorySourceConfig) -> Result<Self> {
        let records = match entity {
            Entity::Users => Page::from_records((1..=config.records).map(sample_user).collect::<Vec<User>>(), None)?,
            Entity::Content => Page::from_records((1..=config.records).map(sample_content).collect::<Vec<Content>>(), None)?,
        }
        .records;
        let total = Some(records.len() as u64);

        let page_size = if entity.is_paginated() {
            config.page_size.max(1)
        } else {
            records.len().max(1)
        };
        let mut pages: Vec<Page> = records
            .chunks(page_size)
            .map(|chunk| Page {
                records: chunk.to_vec(),
                total,
            })
            .collect();
        if pages.is_empty() {
            pages.push(Page {
                records: Vec::new(),
                total,
            });
        }
        Ok(Self::from_pages(pages))
    }
}

/// 📅 2023-01-01T00:00:00Z plus `days`. The server's records all live in 2023 and 2024.
fn sample_created_at(days: usize) -> DateTime<Utc> {
    let the_new_year = DateTime::<Utc>::from_timestamp(1_672_531_200, 0).unwrap_or_default();
    the_new_year + Duration::days((days % 730) as i64)
}

fn sample_user(i: usize) -> User {
    const STATUSES: [UserStatus; 3] = [UserStatus::Free, UserStatus::Paid, UserStatus::Trial];
    const COUNTRIES: [Country; 4] = [Country::Us, Country::Br, Country::It, Country::Fr];
    User {
        user_id: format!("user_{i}"),
        age: 18 + (i * 7 % 60) as u32,
        status: STATUSES[i % STATUSES.len()],
        country: COUNTRIES[i % COUNTRIES.len()],
        created_at: sample_created_at(i * 13),
    }
}

fn sample_content(i: usize) -> Content {
    const PRAYER_TYPES: [PrayerType; 6] = [
        PrayerType::Academic,
        PrayerType::Podcast,
        PrayerType::Reflection,
        PrayerType::LectioDivina,
        PrayerType::Rosary,
        PrayerType::Meditation,
    ];
    const MEDIA_TYPES: [MediaType; 3] = [MediaType::Audio, MediaType::Video, MediaType::Text];
    Content {
        content_id: format!("content_{i}"),
        prayer_type: PRAYER_TYPES[i % PRAYER_TYPES.len()],
        media_type: MEDIA_TYPES[i % MEDIA_TYPES.len()],
        created_at: sample_created_at(i * 29),
    }
}

#[async_trait]
impl Source for InMemorySource {
    /// 📄 Next page off the front of the queue. Once it's empty, it stays empty.
    async fn next_page(&mut self) -> Result<Option<Page>> {
        Ok(self.pages.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_users_come_in_pages_of_two() -> Result<()> {
        let mut source = InMemorySource::sample(Entity::Users, &InMemorySourceConfig::default())?;

        let the_first = source.next_page().await?.expect("💀 first page missing");
        let the_second = source.next_page().await?.expect("💀 second page missing");
        assert_eq!(the_first.len(), 2);
        assert_eq!(the_second.len(), 1);
        assert_eq!(the_first.total, Some(3));
        assert_eq!(the_first.records[0]["user_id"], "user_1");
        assert_eq!(the_second.records[0]["user_id"], "user_3");
        assert!(source.next_page().await?.is_none());
        assert!(source.next_page().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_content_ignores_the_page_size() -> Result<()> {
        let config = InMemorySourceConfig {
            records: 5,
            page_size: 1,
        };
        let mut source = InMemorySource::sample(Entity::Content, &config)?;
        let the_page = source.next_page().await?.expect("💀 content page missing");
        assert_eq!(the_page.len(), 5);
        assert!(the_page.records[0]["created_at"].as_str().is_some_and(|s| s.ends_with('Z')));
        assert!(source.next_page().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_nothing_still_shows_up_as_one_empty_page() -> Result<()> {
        let config = InMemorySourceConfig {
            records: 0,
            ..InMemorySourceConfig::default()
        };
        let mut source = InMemorySource::sample(Entity::Users, &config)?;
        let the_page = source.next_page().await?.expect("💀 empty collections still get one page");
        assert!(the_page.is_empty());
        assert_eq!(the_page.total, Some(0));
        assert!(source.next_page().await?.is_none());
        Ok(())
    }
}
