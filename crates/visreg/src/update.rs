//! Base generation: copy a fresh screenshot into the base tree.
//!
//! Some headless runs nest screenshots under an extra "common root"
//! directory that interactive runs do not produce. When the host reports
//! that fragment, the screenshot is moved back to its canonical location so
//! both modes leave the same layout behind.

use crate::codec;
use crate::paths::{check_spec_path, sanitize_name, PathResolver, SnapshotKind};
use crate::prune::prune_upward_until;
use crate::result::{VisregError, VisregResult};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Request to (re)generate a base image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Spec-relative directory the snapshot belongs to
    pub spec_path: PathBuf,
    /// Snapshot name before sanitisation
    pub name: String,
    /// Absolute path of the captured screenshot
    pub actual_path: PathBuf,
    /// Base root override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_directory: Option<PathBuf>,
    /// Extra directory fragment the host nested the screenshot under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_root: Option<PathBuf>,
}

impl UpdateRequest {
    /// Request with the default base root
    #[must_use]
    pub fn new(
        spec_path: impl Into<PathBuf>,
        name: impl Into<String>,
        actual_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            spec_path: spec_path.into(),
            name: name.into(),
            actual_path: actual_path.into(),
            base_directory: None,
            common_root: None,
        }
    }

    /// Set the base root
    #[must_use]
    pub fn with_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_directory = Some(dir.into());
        self
    }

    /// Set the common-root fragment
    #[must_use]
    pub fn with_common_root(mut self, fragment: impl Into<PathBuf>) -> Self {
        self.common_root = Some(fragment.into());
        self
    }
}

/// Outcome of a base update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Always `true`: a base image now exists
    pub base_generated: bool,
}

/// Copy the screenshot to `<base root>/<spec path>/<name>.png`
pub async fn update_snapshot(
    resolver: &PathResolver,
    request: &UpdateRequest,
) -> VisregResult<UpdateResult> {
    let name = sanitize_name(&request.name)?;
    let dest = resolver.resolve(
        SnapshotKind::Base,
        request.base_directory.as_deref(),
        &request.spec_path,
        &name,
    )?;

    if let Some(dir) = dest.parent() {
        codec::ensure_dir(dir).await?;
    }

    // Copying a file onto itself truncates it.
    if same_file(&request.actual_path, &dest).await {
        debug!(base = %dest.display(), "screenshot already is the base image");
    } else {
        tokio::fs::copy(&request.actual_path, &dest)
            .await
            .map_err(|source| VisregError::Copy {
                from: request.actual_path.clone(),
                to: dest.clone(),
                source,
            })?;
    }
    info!(base = %dest.display(), "generated base image");

    if let Some(fragment) = &request.common_root {
        relocate_from_common_root(&request.actual_path, fragment).await?;
    }

    Ok(UpdateResult {
        base_generated: true,
    })
}

/// Path of `file` with the first run of `fragment` components removed
///
/// Returns `(canonical path, directory that held the fragment)`, or `None`
/// when `file` does not pass through `fragment`.
pub fn strip_common_root(file: &Path, fragment: &Path) -> Option<(PathBuf, PathBuf)> {
    let needle: Vec<Component<'_>> = fragment
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if needle.is_empty() {
        return None;
    }

    let parts: Vec<Component<'_>> = file.components().collect();
    // The file name itself is never part of the fragment.
    let searchable = parts.len().checked_sub(1)?;
    let start = (0..searchable)
        .find(|&i| i + needle.len() <= searchable && parts[i..i + needle.len()] == needle[..])?;

    let prefix: PathBuf = parts[..start].iter().collect();
    let canonical = prefix.join(parts[start + needle.len()..].iter().collect::<PathBuf>());
    Some((canonical, prefix))
}

/// Move a screenshot out of the common-root nesting and prune what is left
///
/// Returns the new location, or `None` when the path has no such nesting.
pub async fn relocate_from_common_root(
    actual: &Path,
    fragment: &Path,
) -> VisregResult<Option<PathBuf>> {
    check_spec_path(fragment)?;
    let Some((canonical, boundary)) = strip_common_root(actual, fragment) else {
        debug!(path = %actual.display(), "screenshot not under common root");
        return Ok(None);
    };

    if let Some(dir) = canonical.parent() {
        codec::ensure_dir(dir).await?;
    }
    move_file(actual, &canonical)
        .await
        .map_err(|source| VisregError::Relocate {
            from: actual.to_path_buf(),
            to: canonical.clone(),
            source,
        })?;
    debug!(from = %actual.display(), to = %canonical.display(), "relocated screenshot");

    if let Some(original_dir) = actual.parent() {
        prune_upward_until(original_dir, Some(&boundary)).await?;
    }

    Ok(Some(canonical))
}

/// Whether both paths name the same existing file
async fn same_file(a: &Path, b: &Path) -> bool {
    match tokio::try_join!(tokio::fs::canonicalize(a), tokio::fs::canonicalize(b)) {
        Ok((a, b)) => a == b,
        Err(_) => false,
    }
}

/// Rename, falling back to copy and delete across filesystems
async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
