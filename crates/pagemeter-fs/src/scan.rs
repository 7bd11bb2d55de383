//! Recursive directory scanning over overlaid roots.
//!
//! Several roots can overlay one logical namespace (for example a project's
//! `pages/` directory layered over a fallback directory). At every traversal
//! step, an entry name that an earlier root already produced is dropped, so
//! the first root shadows the rest.

use crate::FileSystem;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use regex::Regex;
use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// A file-system error that aborted a scan. No partial results are kept.
#[derive(Debug, Error)]
#[error("Failed to scan {}: {source}", .path.display())]
pub struct ScanError {
    /// Path whose listing or stat failed.
    pub path: PathBuf,
    /// The underlying I/O error.
    #[source]
    pub source: io::Error,
}

/// A directory to read, and the root its output paths are relative to.
#[derive(Debug, Clone)]
struct ScanDir {
    dir: PathBuf,
    origin: PathBuf,
}

/// Names listed in one directory after filtering and shadowing.
#[derive(Debug)]
struct Listing {
    dir: ScanDir,
    names: Vec<String>,
}

/// Recursively lists files under `roots` whose names match `filter`.
///
/// - `ignore`, when given, keeps only top-level entries whose names match it.
/// - Entry names already produced by an earlier root at the same step are
///   dropped (logged at debug level).
/// - Returned paths are relative to the root they were found under, joined
///   with `/` and starting with `/`, e.g. `/blog/[slug].js`.
/// - The result is sorted; it does not depend on I/O completion order.
///
/// # Errors
///
/// Any read or stat failure aborts the whole scan.
pub async fn scan<F>(
    fs: &F,
    roots: &[PathBuf],
    filter: &Regex,
    ignore: Option<&Regex>,
) -> Result<Vec<String>, ScanError>
where
    F: FileSystem + ?Sized,
{
    let dirs = roots
        .iter()
        .map(|root| ScanDir {
            dir: root.clone(),
            origin: root.clone(),
        })
        .collect();

    let mut found = scan_level(fs, dirs, filter, ignore).await?;
    found.sort();
    Ok(found)
}

fn scan_level<'a, F>(
    fs: &'a F,
    dirs: Vec<ScanDir>,
    filter: &'a Regex,
    ignore: Option<&'a Regex>,
) -> BoxFuture<'a, Result<Vec<String>, ScanError>>
where
    F: FileSystem + ?Sized,
{
    async move {
        let listings = read_dirs(fs, dirs, ignore).await?;

        let entries = listings.iter().flat_map(|listing| {
            listing
                .names
                .iter()
                .map(move |name| visit_entry(fs, &listing.dir, name, filter))
        });

        let nested = try_join_all(entries).await?;
        Ok(nested.into_iter().flatten().collect())
    }
    .boxed()
}

/// Reads every directory of one level concurrently, then shadows repeated names.
async fn read_dirs<F>(
    fs: &F,
    dirs: Vec<ScanDir>,
    ignore: Option<&Regex>,
) -> Result<Vec<Listing>, ScanError>
where
    F: FileSystem + ?Sized,
{
    let mut listings = try_join_all(dirs.into_iter().map(|dir| async move {
        let names = fs.read_dir(&dir.dir).await.map_err(|source| ScanError {
            path: dir.dir.clone(),
            source,
        })?;

        let names = names
            .into_iter()
            .filter(|name| ignore.map_or(true, |re| re.is_match(name)))
            .collect();

        Ok::<_, ScanError>(Listing { dir, names })
    }))
    .await?;

    let mut seen = HashSet::new();
    for listing in &mut listings {
        listing.names.retain(|name| {
            if seen.insert(name.clone()) {
                true
            } else {
                debug!(
                    entry = %name,
                    dir = %listing.dir.dir.display(),
                    "entry shadowed by an earlier root"
                );
                false
            }
        });
    }

    Ok(listings)
}

async fn visit_entry<F>(
    fs: &F,
    parent: &ScanDir,
    name: &str,
    filter: &Regex,
) -> Result<Vec<String>, ScanError>
where
    F: FileSystem + ?Sized,
{
    let path = parent.dir.join(name);
    let meta = fs.metadata(&path).await.map_err(|source| ScanError {
        path: path.clone(),
        source,
    })?;

    if !meta.exists {
        return Err(ScanError {
            source: io::Error::new(io::ErrorKind::NotFound, "entry vanished during scan"),
            path,
        });
    }

    if meta.is_dir {
        let child = ScanDir {
            dir: path,
            origin: parent.origin.clone(),
        };
        return scan_level(fs, vec![child], filter, None).await;
    }

    if !filter.is_match(name) {
        trace!(file = %path.display(), "skipping file not matching filter");
        return Ok(Vec::new());
    }

    Ok(vec![relative_to(&path, &parent.origin)])
}

fn relative_to(path: &Path, origin: &Path) -> String {
    let rest = path.strip_prefix(origin).unwrap_or(path);
    let mut out = String::new();
    for component in rest.components() {
        if let Component::Normal(part) = component {
            out.push('/');
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to_strips_origin() {
        assert_eq!(
            relative_to(Path::new("/app/pages/blog/[slug].js"), Path::new("/app/pages")),
            "/blog/[slug].js"
        );
        assert_eq!(
            relative_to(Path::new("/app/pages/index.js"), Path::new("/app/pages/")),
            "/index.js"
        );
    }
}
