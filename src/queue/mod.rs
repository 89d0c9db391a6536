//! Download queue
//!
//! Links submitted by users live in the `queue` table until the worker
//! settles them as `done` or `error`.

mod models;
mod store;

pub use models::{
    AddOutcome, Category, ItemStatus, PostMeta, QueueItem, QueueSnapshot, QueueStats,
};
pub use store::{QueueStore, RECENT_LIMIT};
