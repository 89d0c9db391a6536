//! Input validation shared by the API server and the CLI client.
//!
//! Both sides run the same checks so the client can refuse obviously bad input
//! before making a request, while the server stays the authority.

use thiserror::Error;

/// URL fragments that identify a Xiaohongshu post link.
pub const ACCEPTED_LINK_PATTERNS: &[&str] = &[
    "xiaohongshu.com/explore/",
    "xiaohongshu.com/discovery/",
    "xhslink.com/",
];

pub const DEFAULT_CATEGORY: &str = "default";
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MIN_DELAY_SECONDS: u64 = 30;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("link must not be empty")]
    EmptyLink,
    #[error("not a Xiaohongshu post link: {0}")]
    UnsupportedLink(String),
    #[error("category is longer than {max} characters", max = MAX_CATEGORY_LEN)]
    CategoryTooLong,
    #[error("category {0:?} is not usable as a folder name")]
    InvalidCategory(String),
    #[error("delay must be at least {min} seconds, got {0}", min = MIN_DELAY_SECONDS)]
    DelayTooShort(u64),
    #[error("download path must not be empty")]
    EmptyDownloadPath,
    #[error("invalid queue item id {0:?}")]
    InvalidId(String),
}

/// Trim a link and check it points at a Xiaohongshu post.
pub fn validate_link(raw: &str) -> Result<String, ValidationError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyLink);
    }
    if !ACCEPTED_LINK_PATTERNS.iter().any(|p| url.contains(p)) {
        return Err(ValidationError::UnsupportedLink(url.to_string()));
    }
    Ok(url.to_string())
}

/// Trim a category name, falling back to [`DEFAULT_CATEGORY`] when blank.
///
/// Categories double as sub-directory names under the download path, so
/// separators and relative components are refused.
pub fn normalize_category(raw: Option<&str>) -> Result<String, ValidationError> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Ok(DEFAULT_CATEGORY.to_string());
    }
    if name.chars().count() > MAX_CATEGORY_LEN {
        return Err(ValidationError::CategoryTooLong);
    }
    if name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
    {
        return Err(ValidationError::InvalidCategory(name.to_string()));
    }
    Ok(name.to_string())
}

pub fn validate_delay(seconds: u64) -> Result<u64, ValidationError> {
    if seconds < MIN_DELAY_SECONDS {
        return Err(ValidationError::DelayTooShort(seconds));
    }
    Ok(seconds)
}

pub fn validate_download_path(raw: &str) -> Result<String, ValidationError> {
    let path = raw.trim();
    if path.is_empty() {
        return Err(ValidationError::EmptyDownloadPath);
    }
    Ok(path.to_string())
}

/// Trim a queue item id; it must be a single non-empty path segment.
pub fn validate_item_id(raw: &str) -> Result<String, ValidationError> {
    let id = raw.trim();
    if id.is_empty() || id.contains(['/', '\\']) {
        return Err(ValidationError::InvalidId(id.to_string()));
    }
    Ok(id.to_string())
}
