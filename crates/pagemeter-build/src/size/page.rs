//! Exclusive compressed size of a single page.

use super::oracle::SizeOracle;
use super::shared::ManifestSizeEngine;
use futures::future::try_join_all;
use pagemeter_core::{BuildManifest, PageSize, Variant};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Sizes a page by what it adds on top of the shared baseline.
#[derive(Debug)]
pub struct PageSizeCalculator {
    engine: Arc<ManifestSizeEngine>,
}

impl PageSizeCalculator {
    /// Calculator reusing `engine` for the shared set and its oracle for files.
    pub fn new(engine: Arc<ManifestSizeEngine>) -> Self {
        Self { engine }
    }

    fn oracle(&self) -> &SizeOracle {
        self.engine.oracle()
    }

    /// Compressed bytes `page` pulls in beyond the shared files.
    ///
    /// Returns [`PageSize::Unknown`] if any file could not be sized.
    pub async fn page_size(
        &self,
        page: &str,
        dist_root: &Path,
        build_id: &str,
        manifest: &BuildManifest,
        variant: Variant,
    ) -> PageSize {
        let shared = self
            .engine
            .compute_shared_set(manifest, dist_root, variant)
            .await;

        let shared_files: HashSet<&str> = shared.files.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();

        let mut files: Vec<PathBuf> = manifest
            .dependencies(page)
            .iter()
            .filter(|file| seen.insert(file.as_str()))
            .filter(|file| !shared_files.contains(file.as_str()))
            .filter(|file| variant.owns(file))
            .map(|file| dist_root.join(file))
            .collect();
        files.push(entry_bundle_path(dist_root, build_id, page, variant));

        let lookups = files.iter().map(|file| self.oracle().size(file));
        match try_join_all(lookups).await {
            Ok(sizes) => PageSize::Known(sizes.into_iter().sum()),
            Err(err) => {
                debug!(page, error = %err, "page size unknown");
                PageSize::Unknown
            }
        }
    }
}

/// Client entry bundle of `page`: `<dist>/static/<build_id>/pages/<page><suffix>`.
pub fn entry_bundle_path(dist_root: &Path, build_id: &str, page: &str, variant: Variant) -> PathBuf {
    dist_root
        .join("static")
        .join(build_id)
        .join("pages")
        .join(format!("{}{}", page_file_stem(page), variant.bundle_suffix()))
}

/// Route key as a path below a `pages` directory, without extension.
///
/// `/` becomes `index`; other keys lose their leading slash.
pub fn page_file_stem(page: &str) -> &str {
    match page.trim_start_matches('/') {
        "" => "index",
        stem => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::oracle::{gzip_len, GzipSizer};
    use pagemeter_fs::MemoryFileSystem;

    const BUILD_ID: &str = "build-1";

    fn fixture() -> (Arc<MemoryFileSystem>, BuildManifest) {
        let fs = Arc::new(MemoryFileSystem::empty("/app").unwrap());
        fs.add_file("/app/.next/static/runtime/main.js", "main();".repeat(50)).unwrap();
        fs.add_file("/app/.next/static/chunks/blog.js", "blog();".repeat(30)).unwrap();
        fs.add_file("/app/.next/static/build-1/pages/index.js", "index();").unwrap();
        fs.add_file("/app/.next/static/build-1/pages/blog.js", "post();").unwrap();

        let manifest = BuildManifest::from_json(
            r#"{"pages":{
                "/":["static/runtime/main.js","static/runtime/main.module.js"],
                "/blog":["static/runtime/main.js","static/chunks/blog.js","static/chunks/blog.js","static/css/blog.css"]
            }}"#,
        )
        .unwrap();

        (fs, manifest)
    }

    fn calculator(fs: Arc<MemoryFileSystem>) -> PageSizeCalculator {
        let oracle = Arc::new(SizeOracle::new(Arc::new(GzipSizer::new(fs))));
        PageSizeCalculator::new(Arc::new(ManifestSizeEngine::new(oracle)))
    }

    #[test]
    fn test_entry_bundle_path() {
        let dist = Path::new("/app/.next");
        assert_eq!(
            entry_bundle_path(dist, "abc", "/", Variant::Legacy),
            PathBuf::from("/app/.next/static/abc/pages/index.js")
        );
        assert_eq!(
            entry_bundle_path(dist, "abc", "/blog/[slug]", Variant::Modern),
            PathBuf::from("/app/.next/static/abc/pages/blog/[slug].module.js")
        );
    }

    #[tokio::test]
    async fn test_page_size_excludes_shared_files() {
        let (fs, manifest) = fixture();
        let calculator = calculator(fs);
        let dist = Path::new("/app/.next");

        let size = calculator
            .page_size("/blog", dist, BUILD_ID, &manifest, Variant::Legacy)
            .await;

        // The duplicate blog chunk is counted once, the stylesheet not at all.
        let expected = gzip_len("blog();".repeat(30).as_bytes(), 9).unwrap()
            + gzip_len(b"post();", 9).unwrap();
        assert_eq!(size, PageSize::Known(expected));
    }

    #[tokio::test]
    async fn test_page_size_unknown_when_a_lookup_fails() {
        let (fs, manifest) = fixture();
        let calculator = calculator(fs);
        let dist = Path::new("/app/.next");

        // No modern entry bundle exists on disk.
        let size = calculator
            .page_size("/", dist, BUILD_ID, &manifest, Variant::Modern)
            .await;

        assert_eq!(size, PageSize::Unknown);
        assert_eq!(size.as_sentinel(), -1);
    }

    #[tokio::test]
    async fn test_page_size_unknown_when_a_dependency_is_missing() {
        let (fs, _) = fixture();
        let calculator = calculator(fs);
        let manifest = BuildManifest::from_json(
            r#"{"pages":{
                "/":["static/runtime/main.js"],
                "/blog":["static/runtime/main.js","static/chunks/blog.js","static/chunks/gone.js"]
            }}"#,
        )
        .unwrap();

        // The entry bundle and blog.js exist; gone.js does not.
        let size = calculator
            .page_size("/blog", Path::new("/app/.next"), BUILD_ID, &manifest, Variant::Legacy)
            .await;

        assert_eq!(size, PageSize::Unknown);
        assert_eq!(size.as_sentinel(), -1);
    }

    #[tokio::test]
    async fn test_page_missing_from_manifest_is_its_entry_bundle() {
        let (fs, manifest) = fixture();
        fs.add_file("/app/.next/static/build-1/pages/about.js", "about();").unwrap();
        let calculator = calculator(fs);

        let size = calculator
            .page_size("/about", Path::new("/app/.next"), BUILD_ID, &manifest, Variant::Legacy)
            .await;

        assert_eq!(size, PageSize::Known(gzip_len(b"about();", 9).unwrap()));
    }
}
