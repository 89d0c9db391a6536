//! HTTP backend: the REST API consumed by the browser extension, the web
//! dashboard and the `xhsq` client.

use std::path::PathBuf;

use crate::{db::Database, queue::QueueStore};

pub mod api;
pub mod kv_config;
pub mod response;
pub mod router;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub queue: QueueStore,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(db: Database, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue: QueueStore::new(db.clone()),
            db,
            static_dir: static_dir.into(),
        }
    }
}
