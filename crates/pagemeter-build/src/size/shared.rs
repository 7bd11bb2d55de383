//! The baseline every page pays for: files shared by all pages.

use super::oracle::SizeOracle;
use futures::future::try_join_all;
use pagemeter_core::{BuildManifest, ManifestGeneration, SharedSizes, Variant};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct LastComputation {
    generation: ManifestGeneration,
    variant: Variant,
    sizes: Arc<SharedSizes>,
}

/// Computes and memoizes the shared-file baseline of a manifest.
///
/// Only the most recent (manifest, variant) result is kept; asking for a
/// different manifest instance or variant recomputes and replaces it. The
/// memo is written after a computation completes, so two first calls racing
/// on the same manifest both do the work and store equal results.
#[derive(Debug)]
pub struct ManifestSizeEngine {
    oracle: Arc<SizeOracle>,
    last: Mutex<Option<LastComputation>>,
}

impl ManifestSizeEngine {
    /// Engine sizing files through `oracle`.
    pub fn new(oracle: Arc<SizeOracle>) -> Self {
        Self {
            oracle,
            last: Mutex::new(None),
        }
    }

    /// The oracle this engine sizes files with.
    pub fn oracle(&self) -> &Arc<SizeOracle> {
        &self.oracle
    }

    /// Shared files of `manifest` for `variant`, with their sizes.
    ///
    /// Sizes are looked up under `dist_root`. If any lookup fails, the result
    /// keeps the shared file list but reports no sizes and a zero total.
    pub async fn compute_shared_set(
        &self,
        manifest: &BuildManifest,
        dist_root: &Path,
        variant: Variant,
    ) -> Arc<SharedSizes> {
        if let Some(sizes) = self.memoized(manifest.generation(), variant) {
            return sizes;
        }

        let files = shared_files(manifest, variant);
        debug!(count = files.len(), %variant, "computing shared files");

        let lookups = files.iter().map(|file| async move {
            let size = self.oracle.size(&dist_root.join(file)).await?;
            Ok::<_, super::SizeLookupError>((file.clone(), size))
        });

        let size_per_file: BTreeMap<String, u64> = match try_join_all(lookups).await {
            Ok(sizes) => sizes.into_iter().collect(),
            Err(err) => {
                warn!(error = %err, "shared file sizes unavailable, reporting zero");
                BTreeMap::new()
            }
        };

        let sizes = Arc::new(SharedSizes {
            total: size_per_file.values().sum(),
            files,
            size_per_file,
        });

        *self.last.lock() = Some(LastComputation {
            generation: manifest.generation(),
            variant,
            sizes: Arc::clone(&sizes),
        });

        sizes
    }

    fn memoized(&self, generation: ManifestGeneration, variant: Variant) -> Option<Arc<SharedSizes>> {
        self.last
            .lock()
            .as_ref()
            .filter(|last| last.generation == generation && last.variant == variant)
            .map(|last| Arc::clone(&last.sizes))
    }
}

/// Files that appear in the dependency list of every page.
///
/// Only scripts of `variant` are counted, and the polyfills entry is not a
/// page. Each page counts a file once, however often it lists it, and a
/// file is shared when its count equals the page count. Files come back in
/// first-seen order.
pub fn shared_files(manifest: &BuildManifest, variant: Variant) -> Vec<String> {
    let mut expected = 0usize;
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for (_, deps) in manifest.counted_pages() {
        expected += 1;
        let mut listed = HashSet::new();
        for file in deps
            .iter()
            .filter(|file| variant.owns(file))
            .filter(|file| listed.insert(file.as_str()))
        {
            let count = counts.entry(file.as_str()).or_insert_with(|| {
                order.push(file.as_str());
                0
            });
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter(|file| counts.get(file) == Some(&expected))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemeter_core::POLYFILLS_KEY;

    fn manifest(pages: &[(&str, &[&str])]) -> BuildManifest {
        BuildManifest::new(
            pages
                .iter()
                .map(|(page, deps)| {
                    (
                        page.to_string(),
                        deps.iter().map(|d| d.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_shared_files_require_every_page() {
        let manifest = manifest(&[
            ("/", &["static/main.js", "static/framework.js", "static/index.js"]),
            ("/about", &["static/main.js", "static/framework.js"]),
            ("/blog", &["static/main.js", "static/blog.js"]),
        ]);

        assert_eq!(shared_files(&manifest, Variant::Legacy), vec!["static/main.js"]);
    }

    #[test]
    fn test_shared_files_ignore_polyfills_and_styles() {
        let manifest = manifest(&[
            ("/", &["static/main.js", "static/styles.css"]),
            ("/about", &["static/main.js", "static/styles.css"]),
            (POLYFILLS_KEY, &["static/polyfills.js"]),
        ]);

        assert_eq!(shared_files(&manifest, Variant::Legacy), vec!["static/main.js"]);
    }

    #[test]
    fn test_shared_files_split_by_variant() {
        let manifest = manifest(&[
            ("/", &["static/main.js", "static/main.module.js"]),
            ("/about", &["static/main.js", "static/main.module.js"]),
        ]);

        assert_eq!(shared_files(&manifest, Variant::Legacy), vec!["static/main.js"]);
        assert_eq!(
            shared_files(&manifest, Variant::Modern),
            vec!["static/main.module.js"]
        );
    }

    #[test]
    fn test_repeated_dependency_counts_once_per_page() {
        let manifest = manifest(&[
            ("/a", &["static/x.js", "static/x.js"]),
            ("/b", &["static/y.js"]),
        ]);
        assert!(shared_files(&manifest, Variant::Legacy).is_empty());

        let manifest = manifest_with_repeat();
        assert_eq!(shared_files(&manifest, Variant::Legacy), vec!["static/main.js"]);
    }

    fn manifest_with_repeat() -> BuildManifest {
        manifest(&[
            ("/", &["static/main.js", "static/main.js", "static/chunk.js"]),
            ("/about", &["static/main.js"]),
            ("/blog", &["static/main.js", "static/chunk.js", "static/chunk.js"]),
        ])
    }

    #[test]
    fn test_empty_manifest_shares_nothing() {
        let manifest = manifest(&[(POLYFILLS_KEY, &["static/polyfills.js"])]);
        assert!(shared_files(&manifest, Variant::Legacy).is_empty());
    }

    #[cfg(feature = "property-tests")]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn pages_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
            prop::collection::vec(
                prop::collection::vec(
                    (0usize..6, any::<bool>()).prop_map(|(i, modern)| {
                        if modern {
                            format!("static/chunk{}.module.js", i)
                        } else {
                            format!("static/chunk{}.js", i)
                        }
                    }),
                    0..8,
                ),
                1..6,
            )
        }

        proptest! {
            #[test]
            fn test_shared_iff_listed_by_every_page(pages in pages_strategy(), modern in any::<bool>()) {
                let variant = if modern { Variant::Modern } else { Variant::Legacy };
                let manifest = BuildManifest::new(
                    pages
                        .iter()
                        .enumerate()
                        .map(|(i, deps)| (format!("/page{}", i), deps.clone()))
                        .collect(),
                );

                let shared = shared_files(&manifest, variant);

                let universe: std::collections::BTreeSet<&String> =
                    pages.iter().flatten().filter(|f| variant.owns(f)).collect();
                for file in universe {
                    let listing_pages = pages.iter().filter(|deps| deps.contains(file)).count();
                    prop_assert_eq!(shared.contains(file), listing_pages == pages.len());
                }
            }
        }
    }
}
