//! Confinement check for every file operation on the upload directory.

use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Returns true when `candidate` resolves to a path strictly below `root`.
///
/// Both paths are canonicalized, so `..` components and symlinks pointing outside the
/// root are caught. A candidate that does not exist is resolved through its parent
/// directory. Containment is checked per path component, so `/tmp/up` does not contain
/// `/tmp/uploads/x` and trailing separators make no difference.
pub async fn is_within(candidate: &Path, root: &Path) -> bool {
    let Ok(root) = tokio::fs::canonicalize(root).await else {
        return false;
    };
    let Some(candidate) = resolve(candidate).await else {
        return false;
    };

    candidate != root && candidate.starts_with(&root)
}

/// Like [`is_within`], but logs and returns an error on violation.
pub async fn ensure_within(candidate: &Path, root: &Path) -> Result<()> {
    if is_within(candidate, root).await {
        return Ok(());
    }

    tracing::error!(
        path = %candidate.display(),
        root = %root.display(),
        "Refusing file operation outside the upload directory"
    );
    Err(Error::PathViolation {
        path: candidate.display().to_string(),
    })
}

async fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = tokio::fs::canonicalize(path).await {
        return Some(resolved);
    }

    // `file_name` is None for paths ending in `..`, which we refuse outright
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = tokio::fs::canonicalize(parent).await.ok()?;
    Some(parent.join(name))
}
