//! Bulk import of links from a text file

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{ApiClient, ClientError};

const TEMPLATE: &str = "\
# Add XHS links here, one per line
# Example: https://www.xiaohongshu.com/explore/xxx?xsec_token=xxx
";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    /// Already in the queue; counted as accepted
    pub duplicates: usize,
    pub failed: Vec<(String, String)>,
    /// Set when the file was missing and a template was written instead
    pub template_created: bool,
    pub failed_file: Option<PathBuf>,
    pub done_file: Option<PathBuf>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.added + self.duplicates + self.failed.len()
    }
}

/// Links in `contents`, skipping blank lines and `#` comments
pub fn read_links(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Queue every link in `path`.
///
/// Rejected links are written to `<path>.failed`; once every link has been
/// accepted the file is renamed to `<path>.done`.
pub async fn import_file(
    client: &ApiClient,
    path: &Path,
    category: Option<&str>,
) -> Result<ImportReport, ImportError> {
    let mut report = ImportReport::default();

    if !tokio::fs::try_exists(path).await? {
        tokio::fs::write(path, TEMPLATE).await?;
        info!("Created {}; add links to it and run again", path.display());
        report.template_created = true;
        return Ok(report);
    }

    let contents = tokio::fs::read_to_string(path).await?;
    let links = read_links(&contents);
    if links.is_empty() {
        info!("No links in {}", path.display());
        return Ok(report);
    }

    info!("Found {} link(s) in {}", links.len(), path.display());
    for (n, link) in links.iter().enumerate() {
        match client.add(link, category).await {
            Ok(response) if response.success => {
                info!("[{}/{}] {}", n + 1, links.len(), response.message);
                report.added += 1;
            }
            Ok(response) => {
                info!("[{}/{}] {}: {}", n + 1, links.len(), response.message, link);
                report.duplicates += 1;
            }
            // no point going on if the server is down
            Err(e @ ClientError::Connect(..)) => return Err(e.into()),
            Err(e) => {
                warn!("[{}/{}] {}: {}", n + 1, links.len(), link, e);
                report.failed.push((link.to_string(), e.to_string()));
            }
        }
    }

    if report.failed.is_empty() {
        let done = with_suffix(path, ".done");
        tokio::fs::rename(path, &done).await?;
        info!("Renamed {} to {}", path.display(), done.display());
        report.done_file = Some(done);
    } else {
        let failed = with_suffix(path, ".failed");
        let mut body = report
            .failed
            .iter()
            .map(|(link, _)| link.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        body.push('\n');
        tokio::fs::write(&failed, body).await?;
        warn!(
            "{} link(s) rejected, saved to {}",
            report.failed.len(),
            failed.display()
        );
        report.failed_file = Some(failed);
    }

    Ok(report)
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
