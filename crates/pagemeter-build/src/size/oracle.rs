//! Memoized compressed-size lookups.

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures::future::{BoxFuture, FutureExt, Shared};
use pagemeter_fs::FileSystem;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Turns a file into the number of bytes it costs over the wire.
#[async_trait]
pub trait ContentSizer: Send + Sync {
    /// Compressed size of the file at `path`.
    async fn compressed_size(&self, path: &Path) -> io::Result<u64>;
}

/// A size lookup that failed. Cheap to clone so a cached failure can be
/// handed to every waiter.
#[derive(Debug, Clone, Error)]
#[error("Failed to size {}: {source}", .path.display())]
pub struct SizeLookupError {
    /// The file that could not be sized.
    pub path: PathBuf,
    /// The underlying I/O error.
    #[source]
    pub source: Arc<io::Error>,
}

/// Gzip size of a file read through a [`FileSystem`].
pub struct GzipSizer<F: FileSystem> {
    fs: Arc<F>,
    level: u32,
}

impl<F: FileSystem> GzipSizer<F> {
    /// Sizer using the highest compression level, matching `gzip -9`.
    pub fn new(fs: Arc<F>) -> Self {
        Self { fs, level: 9 }
    }

    /// Sizer with an explicit compression level (0-9).
    pub fn with_level(fs: Arc<F>, level: u32) -> Self {
        Self {
            fs,
            level: level.min(9),
        }
    }
}

/// Length of `bytes` after gzip compression at `level`.
pub fn gzip_len(bytes: &[u8], level: u32) -> io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?.len() as u64)
}

#[async_trait]
impl<F: FileSystem> ContentSizer for GzipSizer<F> {
    async fn compressed_size(&self, path: &Path) -> io::Result<u64> {
        let bytes = self.fs.read(path).await?;
        let level = self.level;
        tokio::task::spawn_blocking(move || gzip_len(&bytes, level))
            .await
            .map_err(io::Error::other)?
    }
}

type PendingSize = Shared<BoxFuture<'static, Result<u64, SizeLookupError>>>;

/// Per-file size memo, valid for one build pass.
///
/// The cache stores the in-flight computation itself, so callers racing on
/// the same path await one shared lookup. Failures are memoized too. Entries
/// are never evicted: output files are assumed not to change during a pass.
pub struct SizeOracle {
    sizer: Arc<dyn ContentSizer>,
    cache: Mutex<HashMap<PathBuf, PendingSize>>,
}

impl SizeOracle {
    /// Creates an empty oracle around `sizer`.
    pub fn new(sizer: Arc<dyn ContentSizer>) -> Self {
        Self {
            sizer,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Compressed size of `path`, computed at most once.
    pub async fn size(&self, path: &Path) -> Result<u64, SizeLookupError> {
        let pending = {
            let mut cache = self.cache.lock();
            cache
                .entry(path.to_path_buf())
                .or_insert_with(|| {
                    trace!(file = %path.display(), "sizing file");
                    let sizer = Arc::clone(&self.sizer);
                    let path = path.to_path_buf();
                    async move {
                        sizer
                            .compressed_size(&path)
                            .await
                            .map_err(|source| SizeLookupError {
                                path,
                                source: Arc::new(source),
                            })
                    }
                    .boxed()
                    .shared()
                })
                .clone()
        };

        pending.await
    }

    /// Number of distinct paths seen so far.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}

impl fmt::Debug for SizeOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeOracle")
            .field("cached", &self.cached_len())
            .finish()
    }
}
