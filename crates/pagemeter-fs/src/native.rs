//! Native filesystem implementation using std::fs + tokio.

use crate::{FileMetadata, FileSystem};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::task;

/// Native filesystem scoped to a project root (usually the app directory).
///
/// Blocking `std::fs` calls are wrapped with `tokio::task::spawn_blocking`
/// so that many reads can be pending on the runtime at once.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    project_root: PathBuf,
}

impl NativeFileSystem {
    /// Create a new native filesystem scoped to a project root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or can't be canonicalized.
    pub fn new(project_root: impl AsRef<Path>) -> io::Result<Self> {
        let project_root = project_root.as_ref().canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!(
                    "Project root {} is not usable: {}",
                    project_root.as_ref().display(),
                    e
                ),
            )
        })?;

        Ok(Self { project_root })
    }

    /// Resolve `path` against the root and make sure it stays inside it.
    ///
    /// Symlinks are resolved when the path exists; otherwise the check is
    /// done on the syntactically normalized path.
    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        let resolved = absolute
            .canonicalize()
            .unwrap_or_else(|_| resolve_missing(&absolute));

        if !resolved.starts_with(&self.project_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside project root {}",
                    resolved.display(),
                    self.project_root.display()
                ),
            ));
        }

        Ok(resolved)
    }
}

/// Removes `.` and `..` components without touching the disk.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                result.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
        }
    }
    result
}

/// Canonicalizes the deepest existing ancestor of a path that doesn't exist
/// and re-attaches the remaining components.
fn resolve_missing(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let mut tail = Vec::new();
    let mut current = normalized.as_path();

    loop {
        if let Ok(canonical) = current.canonicalize() {
            return tail.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                current = parent;
            }
            _ => return normalized,
        }
    }
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await.map_err(io::Error::other)?
}

#[async_trait::async_trait]
impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let validated = self.validate_path(path)?;
        blocking(move || Ok(validated.exists())).await
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let validated = self.validate_path(path)?;
        blocking(move || std::fs::read_to_string(&validated)).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let validated = self.validate_path(path)?;
        blocking(move || std::fs::read(&validated)).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let validated = self.validate_path(path)?;
        blocking(move || match std::fs::metadata(&validated) {
            Ok(meta) => Ok(FileMetadata {
                exists: true,
                is_file: meta.is_file(),
                is_dir: meta.is_dir(),
                size: meta.len(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileMetadata::missing()),
            Err(e) => Err(e),
        })
        .await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let validated = self.validate_path(path)?;
        blocking(move || {
            std::fs::read_dir(&validated)?
                .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
                .collect()
        })
        .await
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}
