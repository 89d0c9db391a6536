//! SurrealDB-backed queue operations

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};
use ulid::Ulid;

use super::models::{
    AddOutcome, Category, ItemStatus, PostMeta, QueueItem, QueueRecord, QueueSnapshot,
    QueueStats, StatusPatch,
};
use crate::db::{Database, QUEUE_TABLE};
use crate::error::Result;
use crate::validate::{normalize_category, validate_link};

/// Number of items `GET /api/queue` returns
pub const RECENT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct StatusCount {
    status: ItemStatus,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct CategoryCount {
    category: Option<String>,
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Count {
    count: u64,
}

#[derive(Clone)]
pub struct QueueStore {
    db: Database,
    // check-then-create for `add` must not interleave
    insert_lock: Arc<Mutex<()>>,
}

impl QueueStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            insert_lock: Arc::new(Mutex::new(())),
        }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn add(&self, url: &str, category: Option<&str>) -> Result<AddOutcome> {
        let url = validate_link(url)?;
        let category = normalize_category(category)?;

        let _guard = self.insert_lock.lock().await;

        if self.find_by_url(&url).await?.is_some() {
            debug!(%url, "Link already queued");
            return Ok(AddOutcome::Duplicate);
        }

        let id = Ulid::new().to_string();
        let record = QueueRecord::pending(url.clone(), category.clone());
        let _: Option<QueueRecord> = self
            .db
            .create((QUEUE_TABLE, id.as_str()))
            .content(record)
            .await?;

        info!(%id, %url, %category, "Link added to queue");
        Ok(AddOutcome::Added { id, category })
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<QueueRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM queue WHERE url = $url LIMIT 1")
            .bind(("url", url.to_owned()))
            .await?;
        let rows: Vec<QueueRecord> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    #[cfg(test)]
    pub async fn get(&self, id: &str) -> Result<Option<QueueItem>> {
        let record: Option<QueueRecord> = self.db.select((QUEUE_TABLE, id)).await?;
        Ok(record.and_then(QueueRecord::into_item))
    }

    /// The newest `limit` items plus counts over the whole queue
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn recent(&self, limit: usize) -> Result<QueueSnapshot> {
        let mut res = self
            .db
            .query(format!(
                "SELECT * FROM queue ORDER BY created_at DESC LIMIT {limit}"
            ))
            .await?;
        let rows: Vec<QueueRecord> = res.take(0)?;
        let items = rows
            .into_iter()
            .filter_map(QueueRecord::into_item)
            .collect();

        Ok(QueueSnapshot {
            items,
            stats: self.stats().await?,
        })
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        let mut res = self
            .db
            .query("SELECT status, count() AS count FROM queue GROUP BY status")
            .await?;
        let rows: Vec<StatusCount> = res.take(0)?;

        let mut stats = QueueStats::default();
        for row in rows {
            stats.record(row.status, row.count);
        }
        trace!(?stats, "Queue stats");
        Ok(stats)
    }

    /// Distinct categories with their item counts, sorted by name
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let mut res = self
            .db
            .query("SELECT category, count() AS count FROM queue GROUP BY category")
            .await?;
        let rows: Vec<CategoryCount> = res.take(0)?;

        let mut categories: Vec<Category> = rows
            .into_iter()
            .filter_map(|row| {
                row.category.map(|name| Category {
                    name,
                    count: row.count,
                })
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Delete one item regardless of status. Returns whether it existed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed: Option<QueueRecord> = self.db.delete((QUEUE_TABLE, id)).await?;
        match removed {
            Some(_) => {
                info!(%id, "Queue item deleted");
                Ok(true)
            }
            None => {
                warn!(%id, "Attempted to delete non-existent queue item");
                Ok(false)
            }
        }
    }

    /// Delete every pending item, leaving finished and failed ones in place
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn clear_pending(&self) -> Result<usize> {
        let mut res = self
            .db
            .query("DELETE queue WHERE status = $status RETURN BEFORE")
            .bind(("status", ItemStatus::Pending))
            .await?;
        let removed: Vec<QueueRecord> = res.take(0)?;
        info!(count = removed.len(), "Cleared pending items");
        Ok(removed.len())
    }

    /// Oldest pending item, the next one the worker should fetch
    pub async fn next_pending(&self) -> Result<Option<QueueItem>> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM queue WHERE status = $status \
                 ORDER BY created_at ASC, id ASC LIMIT 1",
            )
            .bind(("status", ItemStatus::Pending))
            .await?;
        let rows: Vec<QueueRecord> = res.take(0)?;
        Ok(rows.into_iter().find_map(QueueRecord::into_item))
    }

    pub async fn pending_count(&self) -> Result<u64> {
        let mut res = self
            .db
            .query(
                "SELECT count() AS count FROM queue \
                 WHERE status = $status GROUP ALL",
            )
            .bind(("status", ItemStatus::Pending))
            .await?;
        let rows: Vec<Count> = res.take(0)?;
        Ok(rows.first().map(|row| row.count).unwrap_or(0))
    }

    /// Returns false when the item was deleted while it was being fetched
    #[tracing::instrument(level = "debug", skip(self, meta))]
    pub async fn mark_done(&self, id: &str, meta: PostMeta) -> Result<bool> {
        self.settle(id, StatusPatch::done(meta)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn mark_error(&self, id: &str, message: &str) -> Result<bool> {
        self.settle(id, StatusPatch::error(message)).await
    }

    async fn settle(&self, id: &str, patch: StatusPatch) -> Result<bool> {
        let updated: Option<QueueRecord> =
            self.db.update((QUEUE_TABLE, id)).merge(patch).await?;
        if updated.is_none() {
            warn!(%id, "Queue item vanished before its status could be recorded");
        }
        Ok(updated.is_some())
    }
}
