//! FileSystem trait for platform-agnostic filesystem operations.

use std::io;
use std::path::Path;

/// File metadata compatible across implementations.
///
/// Symlinks are followed, like `stat(2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Whether the path exists.
    pub exists: bool,
    /// Whether the path is a file (false if directory or doesn't exist).
    pub is_file: bool,
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// File size in bytes (0 for directories or non-existent files).
    pub size: u64,
}

impl FileMetadata {
    /// Metadata for a path that does not exist.
    pub fn missing() -> Self {
        Self {
            exists: false,
            is_file: false,
            is_dir: false,
            size: 0,
        }
    }
}

/// Filesystem abstraction used by the scanner and by size lookups.
///
/// # Design Decisions
///
/// ## Async
///
/// All methods are async:
/// - **Native**: blocking `std::fs` calls run on tokio's blocking pool
/// - **Memory**: operations complete immediately
///
/// ## Error Handling
///
/// Uses `std::io::Result<T>` so callers can tell `NotFound` apart from
/// everything else.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Read file contents as a string.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if file doesn't exist.
    /// Returns `io::ErrorKind::InvalidData` if file is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read file contents as bytes.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Get file/directory metadata.
    ///
    /// Returns metadata even if the file doesn't exist (exists=false).
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    /// List the entry names of a directory, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if the directory doesn't exist.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Get the project root this filesystem is scoped to.
    ///
    /// All operations are validated against this root.
    fn project_root(&self) -> &Path;
}
