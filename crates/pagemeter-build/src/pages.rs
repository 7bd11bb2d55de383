//! Page source discovery.
//!
//! Finds the page files of a project by scanning its pages directory for
//! the configured extensions, and maps them to route keys.

use pagemeter_core::{Error, Result};
use pagemeter_fs::{scan, FileSystem, ScanError};
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Builds the page filter `\.(?:ext1|ext2|...)$`.
///
/// Extensions are given without the leading dot and are matched literally.
pub fn page_filter(extensions: &[String]) -> Result<Regex> {
    if extensions.is_empty() {
        return Err(Error::InvalidConfig {
            message: "At least one page extension is required".to_string(),
        });
    }

    let alternatives: Vec<String> = extensions
        .iter()
        .map(|ext| regex::escape(ext.trim_start_matches('.')))
        .collect();

    Regex::new(&format!(r"\.(?:{})$", alternatives.join("|")))
        .map_err(|e| Error::Pattern(e.to_string()))
}

/// Lists page files under `pages_dir`, sorted, as `/`-rooted relative paths.
///
/// # Errors
///
/// Any read failure while scanning aborts with [`Error::Scan`].
pub async fn collect_pages<F>(fs: &F, pages_dir: &Path, extensions: &[String]) -> Result<Vec<String>>
where
    F: FileSystem + ?Sized,
{
    validate_pages_dir(pages_dir)?;
    let filter = page_filter(extensions)?;

    let pages = scan(fs, &[pages_dir.to_path_buf()], &filter, None)
        .await
        .map_err(scan_error)?;

    debug!(count = pages.len(), dir = %pages_dir.display(), "collected pages");
    Ok(pages)
}

fn scan_error(err: ScanError) -> Error {
    Error::Scan {
        path: err.path,
        source: err.source,
    }
}

/// Route key of a page file, e.g. `/blog/index.tsx` -> `/blog`.
pub fn page_route(page_file: &str) -> String {
    let without_ext = match page_file.rfind('.') {
        Some(dot) if dot > page_file.rfind('/').unwrap_or(0) => &page_file[..dot],
        _ => page_file,
    };

    match without_ext.strip_suffix("/index") {
        Some("") => "/".to_string(),
        Some(parent) => parent.to_string(),
        None => without_ext.to_string(),
    }
}

/// Refuses to treat the filesystem root as a pages directory.
fn validate_pages_dir(dir: &Path) -> Result<()> {
    if dir.parent().is_none() && dir.has_root() {
        return Err(Error::InvalidConfig {
            message: "Refusing to scan filesystem root".to_string(),
        });
    }
    Ok(())
}
