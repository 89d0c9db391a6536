//! Plain-text rendering of API answers for the terminal

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::backend::kv_config::DownloaderSettings;
use crate::queue::{Category, ItemStatus, QueueItem, QueueSnapshot, QueueStats};

const URL_WIDTH: usize = 50;
/// Pending items shown in the short listing
pub const PENDING_PREVIEW: usize = 15;

pub fn truncate_url(url: &str) -> String {
    if url.chars().count() <= URL_WIDTH {
        return url.to_string();
    }
    let head: String = url.chars().take(URL_WIDTH).collect();
    format!("{head}...")
}

pub fn status_label(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "Pending",
        ItemStatus::Done => "Done",
        ItemStatus::Error => "Failed",
    }
}

pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

pub fn stats_line(stats: &QueueStats) -> String {
    format!(
        "Pending: {}  Done: {}  Failed: {}  Total: {}",
        stats.pending,
        stats.done,
        stats.error,
        stats.total()
    )
}

/// Stats followed by the oldest-first pending items, capped at [`PENDING_PREVIEW`]
pub fn pending_list(snapshot: &QueueSnapshot) -> String {
    let mut out = stats_line(&snapshot.stats);
    out.push('\n');

    // the API lists newest first; the worker takes the oldest first
    let mut pending: Vec<&QueueItem> = snapshot.pending().collect();
    pending.reverse();
    if pending.is_empty() {
        out.push_str("Queue is empty\n");
        return out;
    }

    for (position, item) in pending.iter().take(PENDING_PREVIEW).enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. [{}] {}",
            position + 1,
            item.category,
            truncate_url(&item.url)
        );
    }
    if pending.len() > PENDING_PREVIEW {
        let _ = writeln!(out, "     ... and {} more", pending.len() - PENDING_PREVIEW);
    }
    out
}

/// Every listed item, newest first
pub fn full_table(snapshot: &QueueSnapshot) -> String {
    let mut out = stats_line(&snapshot.stats);
    out.push('\n');
    if snapshot.items.is_empty() {
        out.push_str("Queue is empty\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<26}  {:<8}  {:<12}  {:<19}  {:<19}  URL / DETAIL",
        "ID", "STATUS", "CATEGORY", "ADDED", "DOWNLOADED"
    );
    for item in &snapshot.items {
        let _ = writeln!(
            out,
            "{:<26}  {:<8}  {:<12}  {:<19}  {:<19}  {}",
            item.id,
            status_label(item.status),
            item.category,
            format_time(Some(item.created_at)),
            format_time(item.downloaded_at),
            truncate_url(&item.url)
        );
        if let Some(detail) = item_detail(item) {
            let _ = writeln!(out, "{:>92}{}", "", detail);
        }
    }
    out
}

fn item_detail(item: &QueueItem) -> Option<String> {
    match item.status {
        ItemStatus::Error => Some(format!(
            "error: {}",
            item.error_msg.as_deref().unwrap_or("unknown")
        )),
        ItemStatus::Done => item.title.as_ref().map(|title| match &item.author {
            Some(author) => format!("{title} - {author}"),
            None => title.clone(),
        }),
        ItemStatus::Pending => None,
    }
}

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories yet\n".to_string();
    }
    let mut out = String::new();
    for category in categories {
        let _ = writeln!(out, "{:<24} {}", category.name, category.count);
    }
    out
}

pub fn settings(settings: &DownloaderSettings) -> String {
    format!(
        "download_path: {}\ndelay_seconds: {} ({} min)\n",
        settings.download_path,
        settings.delay_seconds,
        settings.delay_seconds / 60
    )
}
