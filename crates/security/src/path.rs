//! Path validation: filesystem sandboxing to the workspace directory.
//!
//! File tools may only touch paths under the workspace root. Relative
//! paths are resolved against the root; `..` components and symlinks
//! that lead outside are rejected.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Path '{path}' escapes the workspace")]
    EscapesWorkspace { path: String },

    #[error("Workspace root '{path}' is unusable: {reason}")]
    InvalidRoot { path: String, reason: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// A sandbox rooted at one canonical directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open a workspace. The root must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| PathError::InvalidRoot {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        if !canonical.is_dir() {
            return Err(PathError::InvalidRoot {
                path: root.display().to_string(),
                reason: "not a directory".into(),
            });
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to an absolute location inside the workspace.
    ///
    /// The target does not need to exist (writes create it). The nearest
    /// existing ancestor is canonicalized so symlinks cannot leave the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        let escape = || PathError::EscapesWorkspace { path: path.into() };

        let requested = Path::new(path);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        let normalized = normalize(&joined).ok_or_else(escape)?;
        if !normalized.starts_with(&self.root) {
            return Err(escape());
        }

        // Walk up to the first component that exists on disk.
        let mut existing = normalized.as_path();
        let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
        while !existing.exists() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    tail.push(name);
                    existing = parent;
                }
                _ => return Err(escape()),
            }
        }

        let mut resolved = existing
            .canonicalize()
            .map_err(|e| PathError::CanonicalizeFailed {
                path: path.into(),
                reason: e.to_string(),
            })?;
        for name in tail.into_iter().rev() {
            resolved.push(name);
        }

        if !resolved.starts_with(&self.root) {
            tracing::warn!(path = %path, resolved = %resolved.display(), "Symlink escape blocked");
            return Err(escape());
        }

        Ok(resolved)
    }
}

/// Lexically collapse `.` and `..`. Returns `None` if `..` climbs past the
/// filesystem root.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}
