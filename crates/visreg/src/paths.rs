//! Snapshot path resolution and filename sanitisation.
//!
//! Every snapshot lives at `<root>/<spec path>/<sanitized name>.png`. The
//! base and diff trees share this layout and differ only in their root.

use crate::result::{VisregError, VisregResult};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Default base root, relative to the working directory
pub const DEFAULT_BASE_DIR: &str = "snapshots/base";
/// Default diff root, relative to the working directory
pub const DEFAULT_DIFF_DIR: &str = "snapshots/diff";
/// Extension of every stored snapshot
pub const SNAPSHOT_EXTENSION: &str = "png";

/// Longest sanitized name, in bytes, before the extension is added
const MAX_NAME_BYTES: usize = 255;

fn windows_reserved() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$")
            .expect("reserved-name pattern is valid")
    })
}

const fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"')
        || matches!(c, '\u{0}'..='\u{1f}' | '\u{80}'..='\u{9f}')
}

fn sanitize_once(name: &str) -> String {
    let mut cleaned: String = name.chars().filter(|c| !is_illegal(*c)).collect();

    if cleaned.chars().all(|c| c == '.') || windows_reserved().is_match(&cleaned) {
        cleaned.clear();
    }

    let trimmed_len = cleaned.trim_end_matches(['.', ' ']).len();
    cleaned.truncate(trimmed_len);

    if cleaned.len() > MAX_NAME_BYTES {
        let mut cut = MAX_NAME_BYTES;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
    }

    cleaned
}

/// Strip characters and shapes that are unsafe in a file name
///
/// Removes path separators, `< > : " | ? *`, control characters, names made
/// only of dots, Windows device names and trailing dots or spaces, then caps
/// the result at 255 bytes. Deterministic and idempotent: the pass repeats
/// until nothing changes.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let mut current = sanitize_once(name);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Sanitize `name`, failing when nothing usable is left
pub fn sanitize_name(name: &str) -> VisregResult<String> {
    let sanitized = sanitize(name);
    if sanitized.is_empty() {
        return Err(VisregError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(sanitized)
}

/// Reject spec paths that are absolute or climb out of the root
pub fn check_spec_path(spec_path: &Path) -> VisregResult<()> {
    let escapes = spec_path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(VisregError::InvalidSpecPath {
            path: spec_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Which snapshot tree a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Accepted ground-truth images
    Base,
    /// Generated difference images
    Diff,
}

impl SnapshotKind {
    /// Root used when no override is given
    #[must_use]
    pub const fn default_dir(self) -> &'static str {
        match self {
            Self::Base => DEFAULT_BASE_DIR,
            Self::Diff => DEFAULT_DIFF_DIR,
        }
    }
}

/// Resolves snapshot paths against a working directory
#[derive(Debug, Clone)]
pub struct PathResolver {
    cwd: PathBuf,
}

impl PathResolver {
    /// Resolver anchored at `cwd`
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Working directory default roots hang off
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Root for `kind`: the override when given, else `<cwd>/<default>`
    ///
    /// Relative overrides resolve against the working directory.
    #[must_use]
    pub fn root(&self, kind: SnapshotKind, root_override: Option<&Path>) -> PathBuf {
        match root_override {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => self.cwd.join(dir),
            None => self.cwd.join(kind.default_dir()),
        }
    }

    /// `<root>/<spec path>/<sanitized name>.png`
    ///
    /// `sanitized_name` must already be sanitized; see [`sanitize_name`].
    pub fn resolve(
        &self,
        kind: SnapshotKind,
        root_override: Option<&Path>,
        spec_path: &Path,
        sanitized_name: &str,
    ) -> VisregResult<PathBuf> {
        check_spec_path(spec_path)?;
        if sanitized_name.is_empty() {
            return Err(VisregError::InvalidName {
                name: sanitized_name.to_string(),
            });
        }
        Ok(self
            .root(kind, root_override)
            .join(spec_path)
            .join(format!("{sanitized_name}.{SNAPSHOT_EXTENSION}")))
    }
}
