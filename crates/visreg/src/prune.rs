//! Removal of directories left empty after a file move.

use crate::result::VisregResult;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Delete `dir` if empty, then its parent, and so on
///
/// Stops at the first non-empty directory. A directory that no longer
/// exists counts as already pruned.
pub async fn prune_upward(dir: &Path) -> VisregResult<()> {
    prune_upward_until(dir, None).await
}

/// Like [`prune_upward`], but never removes `boundary` or anything above it
pub async fn prune_upward_until(dir: &Path, boundary: Option<&Path>) -> VisregResult<()> {
    let mut current: Option<PathBuf> = Some(dir.to_path_buf());

    while let Some(dir) = current {
        if boundary.is_some_and(|b| !dir.starts_with(b) || dir == b) {
            break;
        }
        if dir.as_os_str().is_empty() {
            break;
        }

        match is_empty_dir(&dir).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = tokio::fs::remove_dir(&dir).await {
            if e.kind() == io::ErrorKind::NotFound {
                break;
            }
            // Something was written into it after the emptiness check.
            if !is_empty_dir(&dir).await.unwrap_or(true) {
                break;
            }
            return Err(e.into());
        }
        debug!(dir = %dir.display(), "removed empty directory");

        current = dir.parent().map(Path::to_path_buf);
    }

    Ok(())
}

async fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}
