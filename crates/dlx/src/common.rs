//! 📦 Common data structures: the building blocks of dlx
//!
//! 🎬 COLD OPEN. INT. DATA SERVER, 9:00 AM
//!
//! Ten thousand users sit in a Go slice. A thousand pieces of content sit in
//! another. They have been generated at random, they have birthdays in 2023
//! and 2024, and they have no idea they are about to be moved into a lake.
//!
//! This module describes what they look like on the wire: the records, the
//! envelopes those records travel in, and the [`Page`] that carries a batch of
//! them from the source worker to the sink worker. 🦆
//!
//! ⚠️ Records are decoded into their typed shapes on the way in. A record that
//! does not fit the shape fails the page. We do not quietly drop people.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================
//  🏷️ Entity: the two collections we know how to ingest
// ============================================================

/// 🏷️ One of the ingestible collections. There are two. There will always be two.
/// (There will be three by next quarter.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Users,
    Content,
}

impl Entity {
    /// 🏷️ The snake_case name, as it appears in config, URLs and object keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Content => "content",
        }
    }

    /// 📡 Path segment of the collection endpoint, relative to the API base URL.
    pub fn path(&self) -> &'static str {
        // -- same as the name today. the day they diverge, this is the one place to fix.
        self.as_str()
    }

    /// 📄 Whether the endpoint hands the collection out in offset pages.
    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Users)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================
//  👤 Users
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Free,
    Paid,
    Trial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    Us,
    Br,
    It,
    Fr,
}

/// 👤 A user, exactly as the data server describes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub age: u32,
    pub status: UserStatus,
    pub country: Country,
    pub created_at: DateTime<Utc>,
}

/// 📦 The paginated envelope around `GET /users`.
///
/// `next_offset` is signed because the server says `-1` when there is no next page.
/// Using -1 as "none" is a choice someone made. We respect it. We do not endorse it.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersEnvelope {
    pub count: u64,
    pub has_more: bool,
    pub limit: u64,
    pub next_offset: i64,
    pub offset: u64,
    pub total_users: u64,
    pub users: Vec<User>,
}

// ============================================================
//  🙏 Content
// ============================================================

/// 🙏 The content category. Called `prayer_type` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerType {
    Academic,
    Podcast,
    Reflection,
    LectioDivina,
    Rosary,
    Meditation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Audio,
    Video,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub content_id: String,
    pub prayer_type: PrayerType,
    pub media_type: MediaType,
    pub created_at: DateTime<Utc>,
}

/// 📦 The whole-collection envelope around `GET /content`. No pages. Just everything, at once.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEnvelope {
    pub count: u64,
    pub total_content: u64,
    pub content: Vec<Content>,
}

// ============================================================
//  ✉️ Envelope: what every collection response has in common
// ============================================================

/// ✉️ The wrapper around a collection's records.
///
/// # Contract 📜
/// - `next_offset()` returns `None` when the collection is exhausted after this response.
/// - `count()` is what the server *claims* it sent. `into_records()` is what it actually sent.
///   The source compares the two, because trust is earned.
pub trait Envelope: DeserializeOwned + Send + 'static {
    type Record: Serialize + DeserializeOwned + Send;

    /// 🔢 Number of records the server says are in this response.
    fn count(&self) -> u64;
    /// 📏 Total size of the collection, across all pages.
    fn total(&self) -> u64;
    /// ➡️ Offset of the next page, if any. `None` = done.
    fn next_offset(&self) -> Option<u64>;
    /// 📍 Offset this response started at. Whole collections start at 0.
    fn offset(&self) -> u64 {
        0
    }
    fn into_records(self) -> Vec<Self::Record>;
}

impl Envelope for UsersEnvelope {
    type Record = User;

    fn count(&self) -> u64 {
        self.count
    }

    fn total(&self) -> u64 {
        self.total_users
    }

    fn next_offset(&self) -> Option<u64> {
        // -- both signals have to agree. has_more with -1 is a lie, and we refuse to page into a lie.
        if self.has_more && self.next_offset >= 0 {
            Some(self.next_offset as u64)
        } else {
            None
        }
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn into_records(self) -> Vec<User> {
        self.users
    }
}

impl Envelope for ContentEnvelope {
    type Record = Content;

    fn count(&self) -> u64 {
        self.count
    }

    fn total(&self) -> u64 {
        self.total_content
    }

    fn next_offset(&self) -> Option<u64> {
        None
    }

    fn into_records(self) -> Vec<Content> {
        self.content
    }
}

// ============================================================
//  📄 Page: what travels through the channel
// ============================================================

/// 📄 One response worth of records, already decoded and re-encoded as JSON values.
///
/// The source worker sends these, the sink worker receives them. `total` is the
/// collection size the envelope reported, so the progress bar knows where the finish line is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<serde_json::Value>,
    pub total: Option<u64>,
}

impl Page {
    /// 🔄 Turn typed records into JSON documents. Field names survive. Timestamps come back as RFC 3339 `Z`.
    pub fn from_records<R: Serialize>(records: Vec<R>, total: Option<u64>) -> anyhow::Result<Self> {
        let records = records
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records, total })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
