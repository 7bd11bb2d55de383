//! In-memory filesystem implementation.

use crate::{FileMetadata, FileSystem};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Filesystem backed by a map of absolute paths to file contents.
///
/// Directories are implicit: a directory exists as long as some file lives
/// below it. Useful for hosts that hand over build output without disk access,
/// and for deterministic test fixtures.
///
/// # Thread Safety
///
/// Uses `Arc<RwLock<HashMap>>` for interior mutability:
/// - Multiple concurrent readers (common case)
/// - Exclusive writer (setup, or replacing a file between passes)
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    project_root: PathBuf,
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFileSystem {
    /// Create a new filesystem from pre-loaded files.
    ///
    /// # Parameters
    ///
    /// - `project_root`: Virtual project root (e.g., "/app")
    /// - `files`: Map of absolute paths to file contents
    pub fn new(
        project_root: impl AsRef<Path>,
        files: HashMap<PathBuf, Vec<u8>>,
    ) -> io::Result<Self> {
        let project_root = normalize_path(project_root.as_ref())?;

        let mut normalized = HashMap::with_capacity(files.len());
        for (path, contents) in files {
            let path = normalize_path(&path)?;
            if !path.starts_with(&project_root) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("File path outside project root: {}", path.display()),
                ));
            }
            normalized.insert(path, contents);
        }

        Ok(Self {
            project_root,
            files: Arc::new(RwLock::new(normalized)),
        })
    }

    /// Create an empty filesystem.
    pub fn empty(project_root: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(project_root, HashMap::new())
    }

    /// Add or replace a file.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> io::Result<()> {
        let normalized = self.validate_path(path.as_ref())?;
        self.files.write().insert(normalized, contents.into());
        Ok(())
    }

    /// Validate path against project root.
    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };
        let normalized = normalize_path(&absolute)?;

        if !normalized.starts_with(&self.project_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside {}",
                    normalized.display(),
                    self.project_root.display()
                ),
            ));
        }

        Ok(normalized)
    }

    fn is_dir(files: &HashMap<PathBuf, Vec<u8>>, dir: &Path) -> bool {
        files.keys().any(|path| path != dir && path.starts_with(dir))
    }
}

/// Syntactic normalization; `..` may never climb above the first component.
fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let mut components = Vec::new();
    let mut is_absolute = false;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                is_absolute = true;
                components.clear();
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if components.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        "Path attempts to escape project root using ..",
                    ));
                }
                components.pop();
            }
            Component::Normal(name) => components.push(name),
        }
    }

    let mut result = PathBuf::new();
    if is_absolute {
        result.push("/");
    }
    for component in components {
        result.push(component);
    }
    Ok(result)
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("No such file or directory: {}", path.display()),
    )
}

#[async_trait::async_trait]
impl FileSystem for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let normalized = self.validate_path(path)?;
        let files = self.files.read();
        Ok(files.contains_key(&normalized) || Self::is_dir(&files, &normalized))
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let normalized = self.validate_path(path)?;
        self.files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or_else(|| not_found(&normalized))
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let normalized = self.validate_path(path)?;
        let files = self.files.read();

        if let Some(contents) = files.get(&normalized) {
            return Ok(FileMetadata {
                exists: true,
                is_file: true,
                is_dir: false,
                size: contents.len() as u64,
            });
        }

        if Self::is_dir(&files, &normalized) {
            return Ok(FileMetadata {
                exists: true,
                is_file: false,
                is_dir: true,
                size: 0,
            });
        }

        Ok(FileMetadata::missing())
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let normalized = self.validate_path(path)?;
        let files = self.files.read();

        let names: BTreeSet<String> = files
            .keys()
            .filter_map(|file| file.strip_prefix(&normalized).ok())
            .filter_map(|rest| rest.components().next())
            .filter_map(|first| match first {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if names.is_empty() {
            if files.contains_key(&normalized) {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Not a directory: {}", normalized.display()),
                ));
            }
            return Err(not_found(&normalized));
        }

        Ok(names.into_iter().collect())
    }

    fn project_root(&self) -> &Path {
        &self.project_root
    }
}
