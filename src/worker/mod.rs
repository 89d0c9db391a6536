//! Download worker
//!
//! Drains the queue one link at a time: take the oldest pending item, ask the
//! XHS API to download it, record the outcome, then wait `delay_seconds`
//! before the next one so the account behind the XHS API is not rate limited.

pub mod xhs;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, error, info, span, warn};

use crate::backend::kv_config::{DownloaderSettings, KvOptExt};
use crate::config::WorkerConfig;
use crate::db::Database;
use crate::error::Result;
use crate::queue::{PostMeta, QueueStore};
use xhs::XhsClient;

const COUNTDOWN_STEP: Duration = Duration::from_secs(10);

/// What a single pass of the worker did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing was pending
    Idle,
    Processed {
        id: String,
        outcome: std::result::Result<PostMeta, String>,
        /// Pending items left after this one
        remaining: u64,
        /// Delay to observe before the next item
        delay: Duration,
    },
}

pub struct Worker {
    db: Database,
    queue: QueueStore,
    xhs: XhsClient,
    idle: Duration,
    countdown_step: Duration,
    token: CancellationToken,
}

impl Worker {
    pub fn new(
        db: Database,
        config: &WorkerConfig,
        token: CancellationToken,
    ) -> reqwest::Result<Self> {
        let xhs = XhsClient::new(
            config.xhs_api_url.as_str(),
            Duration::from_secs(config.request_timeout),
        )?;
        Ok(Self {
            queue: QueueStore::new(db.clone()),
            db,
            xhs,
            idle: Duration::from_secs(config.idle_seconds),
            countdown_step: COUNTDOWN_STEP,
            token,
        })
    }

    /// Run until the cancellation token fires
    pub async fn run(self) {
        info!("Download worker started");
        info!("XHS API: {}", self.xhs.endpoint());

        while !self.token.is_cancelled() {
            let wait = match self.step().await {
                Ok(Step::Idle) => {
                    info!("No pending links, checking again in {}s", self.idle.as_secs());
                    self.idle
                }
                Ok(Step::Processed {
                    remaining, delay, ..
                }) if remaining > 0 => {
                    info!(
                        remaining,
                        "Waiting {}s ({} min) before the next download",
                        delay.as_secs(),
                        delay.as_secs() / 60
                    );
                    delay
                }
                Ok(Step::Processed { .. }) => Duration::ZERO,
                Err(e) => {
                    error!("Worker pass failed: {}", e);
                    self.idle
                }
            };

            if !self.pause(wait).await {
                break;
            }
        }

        info!("Download worker stopped");
    }

    /// Fetch and settle at most one pending item
    pub async fn step(&self) -> Result<Step> {
        // re-read every pass so edits from the dashboard apply without a restart
        let settings = DownloaderSettings::load(&self.db).await?;
        let delay = Duration::from_secs(settings.delay_seconds);

        let Some(item) = self.queue.next_pending().await? else {
            return Ok(Step::Idle);
        };

        let pending = self.queue.pending_count().await?;
        let item_span = span!(Level::INFO, "download", id = %item.id, category = %item.category);
        let outcome = self
            .download(&item.id, &item.url, pending)
            .instrument(item_span)
            .await?;

        Ok(Step::Processed {
            id: item.id,
            outcome,
            remaining: self.queue.pending_count().await?,
            delay,
        })
    }

    async fn download(
        &self,
        id: &str,
        url: &str,
        pending: u64,
    ) -> Result<std::result::Result<PostMeta, String>> {
        info!(pending, "Downloading {}", url);
        match self.xhs.download(url).await {
            Ok(meta) => {
                info!(
                    "Downloaded: {} - {}",
                    meta.title.as_deref().unwrap_or("untitled"),
                    meta.author.as_deref().unwrap_or("unknown")
                );
                self.queue.mark_done(id, meta.clone()).await?;
                Ok(Ok(meta))
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Download failed: {}", message);
                self.queue.mark_error(id, &message).await?;
                Ok(Err(message))
            }
        }
    }

    /// Sleep for `total`, logging the countdown. Returns false if cancelled.
    async fn pause(&self, total: Duration) -> bool {
        let mut left = total;
        while !left.is_zero() {
            let chunk = left.min(self.countdown_step);
            tokio::select! {
                _ = self.token.cancelled() => return false,
                _ = tokio::time::sleep(chunk) => {}
            }
            left -= chunk;
            if !left.is_zero() {
                info!("Next download in {}s", left.as_secs());
            }
        }
        !self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::kv_config::SettingsPatch;
    use crate::db;
    use crate::queue::ItemStatus;
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};

    /// Fake XHS API: links containing "fail" are refused.
    async fn fake_xhs() -> String {
        async fn detail(Json(req): Json<Value>) -> Json<Value> {
            let url = req["url"].as_str().unwrap_or_default();
            if url.contains("fail") {
                Json(json!({"message": "获取作品数据失败", "data": null}))
            } else {
                Json(json!({
                    "message": "获取作品数据成功",
                    "data": {"作品标题": "title", "作者昵称": "author", "作品类型": "视频"}
                }))
            }
        }
        let app = Router::new().route("/xhs/detail", post(detail));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/xhs/detail")
    }

    async fn worker(db: &Database, token: CancellationToken) -> Worker {
        let config = WorkerConfig {
            xhs_api_url: fake_xhs().await,
            idle_seconds: 30,
            request_timeout: 5,
        };
        Worker::new(db.clone(), &config, token).unwrap()
    }

    #[tokio::test]
    async fn idle_when_queue_is_empty() {
        let db = db::memory().await;
        let worker = worker(&db, CancellationToken::new()).await;
        assert_eq!(worker.step().await.unwrap(), Step::Idle);
    }

    #[tokio::test]
    async fn settles_items_in_order() {
        let db = db::memory().await;
        let queue = QueueStore::new(db.clone());
        queue
            .add("https://www.xiaohongshu.com/explore/ok1", Some("food"))
            .await
            .unwrap();
        queue
            .add("https://www.xiaohongshu.com/explore/fail2", None)
            .await
            .unwrap();
        DownloaderSettings::update(
            &db,
            &SettingsPatch {
                delay_seconds: Some(45),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let worker = worker(&db, CancellationToken::new()).await;

        let Step::Processed {
            id,
            outcome,
            remaining,
            delay,
        } = worker.step().await.unwrap()
        else {
            panic!("expected an item to be processed");
        };
        assert_eq!(outcome.unwrap().post_type.as_deref(), Some("视频"));
        assert_eq!(remaining, 1);
        assert_eq!(delay, Duration::from_secs(45));
        let done = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(done.status, ItemStatus::Done);
        assert_eq!(done.title.as_deref(), Some("title"));
        assert!(done.downloaded_at.is_some());

        let Step::Processed {
            id,
            outcome,
            remaining,
            ..
        } = worker.step().await.unwrap()
        else {
            panic!("expected an item to be processed");
        };
        assert_eq!(outcome, Err("获取作品数据失败".to_string()));
        assert_eq!(remaining, 0);
        let failed = queue.get(&id).await.unwrap().unwrap();
        assert_eq!(failed.status, ItemStatus::Error);
        assert_eq!(failed.error_msg.as_deref(), Some("获取作品数据失败"));
        assert!(failed.downloaded_at.is_none());

        assert_eq!(worker.step().await.unwrap(), Step::Idle);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let db = db::memory().await;
        let token = CancellationToken::new();
        let worker = worker(&db, token.clone()).await;

        let handle = tokio::spawn(worker.run());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn pause_is_cut_short_by_cancel() {
        let db = db::memory().await;
        let token = CancellationToken::new();
        let worker = worker(&db, token.clone()).await;

        assert!(worker.pause(Duration::ZERO).await);
        token.cancel();
        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            worker.pause(Duration::from_secs(120)),
        )
        .await
        .expect("pause should return once cancelled");
        assert!(!finished);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn countdown_is_logged_at_info() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let db = db::memory().await;
        let mut worker = worker(&db, CancellationToken::new()).await;
        worker.countdown_step = Duration::from_millis(10);
        assert!(worker.pause(Duration::from_millis(30)).await);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let ticks = output
            .lines()
            .filter(|line| line.contains("INFO") && line.contains("Next download in"))
            .count();
        assert_eq!(ticks, 2, "{output}");
    }
}
