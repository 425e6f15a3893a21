use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::ToolError;

/// Filesystem access confined to the user data directory.
///
/// Relative paths are joined onto the root and must stay inside it. Absolute
/// paths are trusted as-is: they come from files the user picked themselves.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Open a sandbox on an existing directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ToolError::InvalidPath(format!(
                "{} is not an existing directory",
                root.display()
            )));
        }
        let absolute = std::path::absolute(root)
            .map_err(|e| ToolError::InvalidPath(format!("{}: {}", root.display(), e)))?;
        Ok(Self {
            root: normalize(&absolute),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` against the sandbox root
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        resolve(path, &self.root)
    }

    pub async fn read(&self, path: &str) -> Result<String, ToolError> {
        let full_path = self.resolve(path)?;
        debug!("Reading file: {}", full_path.display());
        if !tokio::fs::try_exists(&full_path).await.unwrap_or(false) {
            return Err(ToolError::FileNotFound(full_path));
        }
        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|source| ToolError::ReadFailed {
                path: full_path,
                source,
            })
    }

    /// Write `content`, creating missing parent directories first
    pub async fn write(&self, path: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, ToolError> {
        let full_path = self.resolve(path)?;
        debug!("Writing file: {}", full_path.display());
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ToolError::WriteFailed {
                    path: full_path.clone(),
                    source,
                })?;
        }
        tokio::fs::write(&full_path, content)
            .await
            .map_err(|source| ToolError::WriteFailed {
                path: full_path.clone(),
                source,
            })?;
        Ok(full_path)
    }

    /// Resolve a path that must point at an existing file
    pub fn existing(&self, path: &str) -> Result<PathBuf, ToolError> {
        let full_path = self.resolve(path)?;
        if full_path.is_file() {
            Ok(full_path)
        } else {
            Err(ToolError::FileNotFound(full_path))
        }
    }
}

/// Resolve `path` against `root`, rejecting traversal outside of it.
pub fn resolve(path: &str, root: &Path) -> Result<PathBuf, ToolError> {
    if path.is_empty() {
        return Err(ToolError::InvalidPath("Path is required".into()));
    }

    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }

    let resolved = normalize(&root.join(candidate));
    if !resolved.starts_with(root) {
        return Err(ToolError::InvalidPath(format!(
            "Path traversal not allowed: {}",
            path
        )));
    }
    Ok(resolved)
}

/// Lexical normalization: drops `.` and folds `..` without touching the disk,
/// so paths of files that do not exist yet can be checked.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
