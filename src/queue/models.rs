//! Data structures for the download queue
//!
//! `QueueRecord` is the row as stored in SurrealDB; `QueueItem` is what the
//! API hands out and what the CLI client reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::sql::{Datetime, Id, Thing};

/// Status of a queued link
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting for the worker
    #[default]
    Pending,
    /// Fetched by the XHS API
    Done,
    /// The XHS API call failed; see `error_msg`
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post metadata returned by the XHS API for a successful download
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub post_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub url: String,
    pub category: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub downloaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub done: u64,
    pub error: u64,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.pending + self.done + self.error
    }

    pub(crate) fn record(&mut self, status: ItemStatus, count: u64) {
        match status {
            ItemStatus::Pending => self.pending += count,
            ItemStatus::Done => self.done += count,
            ItemStatus::Error => self.error += count,
        }
    }
}

/// Most recent items plus whole-queue counts, as served by `GET /api/queue`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub items: Vec<QueueItem>,
    pub stats: QueueStats,
}

impl QueueSnapshot {
    pub fn pending(&self) -> impl Iterator<Item = &QueueItem> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub count: u64,
}

/// Result of queueing a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added { id: String, category: String },
    /// The link is already in the queue, whatever its status
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QueueRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub url: String,
    pub category: String,
    pub status: ItemStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    pub created_at: Datetime,
    #[serde(default)]
    pub downloaded_at: Option<Datetime>,
}

impl QueueRecord {
    pub fn pending(url: String, category: String) -> Self {
        Self {
            id: None,
            url,
            category,
            status: ItemStatus::Pending,
            title: None,
            author: None,
            post_type: None,
            error_msg: None,
            created_at: Datetime::from(Utc::now()),
            downloaded_at: None,
        }
    }

    /// Record key without the table prefix
    pub fn key(&self) -> Option<String> {
        self.id.as_ref().map(|thing| record_key(&thing.id))
    }

    pub fn into_item(self) -> Option<QueueItem> {
        let id = self.key()?;
        Some(QueueItem {
            id,
            url: self.url,
            category: self.category,
            status: self.status,
            title: self.title,
            author: self.author,
            post_type: self.post_type,
            error_msg: self.error_msg,
            created_at: self.created_at.0,
            downloaded_at: self.downloaded_at.map(|d| d.0),
        })
    }
}

/// Fields rewritten whenever the worker settles an item
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusPatch {
    pub status: ItemStatus,
    pub title: Option<String>,
    pub author: Option<String>,
    pub post_type: Option<String>,
    pub error_msg: Option<String>,
    pub downloaded_at: Option<Datetime>,
}

impl StatusPatch {
    pub fn done(meta: PostMeta) -> Self {
        Self {
            status: ItemStatus::Done,
            title: meta.title,
            author: meta.author,
            post_type: meta.post_type,
            error_msg: None,
            downloaded_at: Some(Datetime::from(Utc::now())),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Error,
            title: None,
            author: None,
            post_type: None,
            error_msg: Some(message.into()),
            downloaded_at: None,
        }
    }
}

fn record_key(id: &Id) -> String {
    match id {
        Id::String(s) => s.clone(),
        other => other.to_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ItemStatus::Pending).unwrap(),
            "\"pending\""
        );
        let status: ItemStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(status, ItemStatus::Error);
        assert_eq!(ItemStatus::Done.to_string(), "done");
    }

    #[test]
    fn record_key_strips_table() {
        let mut record = QueueRecord::pending(
            "https://xhslink.com/a/1".to_string(),
            "default".to_string(),
        );
        assert!(record.clone().into_item().is_none());

        record.id = Some(Thing::from(("queue", Id::from("01J0000000000000000000000A"))));
        let item = record.into_item().unwrap();
        assert_eq!(item.id, "01J0000000000000000000000A");
        assert_eq!(item.status, ItemStatus::Pending);
        assert!(item.downloaded_at.is_none());
    }

    #[test]
    fn patches_clear_stale_fields() {
        let done = StatusPatch::done(PostMeta {
            title: Some("t".into()),
            author: Some("a".into()),
            post_type: Some("视频".into()),
        });
        assert!(done.error_msg.is_none());
        assert!(done.downloaded_at.is_some());

        let failed = StatusPatch::error("boom");
        assert_eq!(failed.error_msg.as_deref(), Some("boom"));
        assert!(failed.title.is_none());
        assert!(failed.downloaded_at.is_none());
    }

    #[test]
    fn stats_accumulate() {
        let mut stats = QueueStats::default();
        stats.record(ItemStatus::Pending, 3);
        stats.record(ItemStatus::Error, 1);
        stats.record(ItemStatus::Pending, 1);
        assert_eq!(
            stats,
            QueueStats {
                pending: 4,
                done: 0,
                error: 1
            }
        );
        assert_eq!(stats.total(), 5);
    }
}
