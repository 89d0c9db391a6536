//! Per-category download folders

use std::io;
use std::path::{Path, PathBuf};

use crate::queue::Category;
use crate::validate::normalize_category;

/// Create `base/<category>` for every category, skipping names that are not
/// valid folder names. Existing folders are left alone.
pub async fn create_category_folders(
    base: &Path,
    categories: &[Category],
) -> io::Result<Vec<PathBuf>> {
    let mut created = Vec::with_capacity(categories.len());
    for category in categories {
        let name = match normalize_category(Some(category.name.as_str())) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Skipping category {:?}: {}", category.name, e);
                continue;
            }
        };
        let path = base.join(&name);
        tokio::fs::create_dir_all(&path).await?;
        tracing::info!("Created {}", path.display());
        created.push(path);
    }
    Ok(created)
}
