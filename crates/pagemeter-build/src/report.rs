//! One reporting pass over a build's output.

use crate::classify::{ArtifactClassifier, ArtifactLoader, RuntimeConfigInjector};
use crate::size::{
    page_file_stem, ContentSizer, GzipSizer, ManifestSizeEngine, PageSizeCalculator, SizeOracle,
};
use crate::toml_config::ReportConfig;
use futures::future::join_all;
use pagemeter_core::{BuildManifest, BuildReport, PageInfo, PageSize, Result, Variant};
use pagemeter_fs::FileSystem;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Where a pass reads the build from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSettings {
    /// Absolute compiled output directory.
    pub dist_root: PathBuf,
    /// Id of the build being reported.
    pub build_id: String,
    /// Variant sizes are computed for.
    pub variant: Variant,
    /// Runtime configuration installed before bundles are loaded.
    pub runtime_config: serde_json::Value,
}

/// The shared baseline as shown above the page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedSummary {
    /// Sum of the shared file sizes.
    pub total: u64,
    /// Compressed size of each shared file. Empty when sizing failed.
    pub files: BTreeMap<String, u64>,
}

/// Size and classification state for one build pass.
///
/// Every cache in here (file sizes, the shared set) lives exactly as long as
/// the pass. Start a new pass for a new build.
pub struct ReportPass {
    settings: PassSettings,
    engine: Arc<ManifestSizeEngine>,
    calculator: PageSizeCalculator,
    classifier: ArtifactClassifier,
}

impl ReportPass {
    /// Pass sizing files with `sizer` and classifying with `classifier`.
    pub fn new(
        settings: PassSettings,
        sizer: Arc<dyn ContentSizer>,
        classifier: ArtifactClassifier,
    ) -> Self {
        let oracle = Arc::new(SizeOracle::new(sizer));
        let engine = Arc::new(ManifestSizeEngine::new(oracle));
        let calculator = PageSizeCalculator::new(Arc::clone(&engine));

        Self {
            settings,
            engine,
            calculator,
            classifier,
        }
    }

    /// Pass for the project at `project_root`, configured by `config`.
    ///
    /// Sizes are gzip sizes read through `fs`. The build id is resolved from
    /// the configuration or the dist directory.
    pub async fn from_config<F>(
        fs: Arc<F>,
        project_root: &Path,
        config: &ReportConfig,
        loader: Arc<dyn ArtifactLoader>,
        runtime: Arc<dyn RuntimeConfigInjector>,
    ) -> Result<Self>
    where
        F: FileSystem + 'static,
    {
        let build_id = config.resolve_build_id(fs.as_ref(), project_root).await?;
        let settings = PassSettings {
            dist_root: config.dist_root(project_root),
            build_id,
            variant: config.build.variant,
            runtime_config: config.runtime_config(),
        };
        debug!(
            dist = %settings.dist_root.display(),
            build_id = %settings.build_id,
            variant = %settings.variant,
            "starting report pass"
        );

        let sizer = Arc::new(GzipSizer::with_level(fs, config.build.gzip_level));
        Ok(Self::new(
            settings,
            sizer,
            ArtifactClassifier::new(loader, runtime),
        ))
    }

    /// Server bundle of `page`: `<dist>/server/static/<build_id>/pages/<page>.js`.
    pub fn server_bundle(&self, page: &str) -> PathBuf {
        self.settings
            .dist_root
            .join("server")
            .join("static")
            .join(&self.settings.build_id)
            .join("pages")
            .join(format!("{}.js", page_file_stem(page)))
    }

    /// The shared baseline of `manifest`.
    pub async fn shared_sizes(&self, manifest: &BuildManifest) -> SharedSummary {
        let shared = self
            .engine
            .compute_shared_set(manifest, &self.settings.dist_root, self.settings.variant)
            .await;

        SharedSummary {
            total: shared.total,
            files: shared.size_per_file.clone(),
        }
    }

    /// Size and classification of one page.
    pub async fn page_info(&self, page: &str, manifest: &BuildManifest) -> Result<PageInfo> {
        let size = self
            .calculator
            .page_size(
                page,
                &self.settings.dist_root,
                &self.settings.build_id,
                manifest,
                self.settings.variant,
            )
            .await;

        self.classify_sized(page, size).await
    }

    async fn classify_sized(&self, page: &str, size: PageSize) -> Result<PageInfo> {
        let server_bundle = self.server_bundle(page);
        let classification = self
            .classifier
            .classify(page, &server_bundle, &self.settings.runtime_config)
            .await?
            .unwrap_or_default();

        Ok(PageInfo {
            size,
            is_static: classification.is_static,
            is_prerendered: classification.is_prerendered,
            is_amp: classification.is_hybrid_amp,
            prerender_paths: classification.prerender_paths,
            server_bundle,
        })
    }

    /// Reports every page in `pages`.
    ///
    /// Sizes are computed concurrently. Classification runs one page at a
    /// time and stops at the first error.
    pub async fn run(&self, pages: &[String], manifest: &BuildManifest) -> Result<BuildReport> {
        let shared = self
            .engine
            .compute_shared_set(manifest, &self.settings.dist_root, self.settings.variant)
            .await;

        let sizes = join_all(pages.iter().map(|page| {
            self.calculator.page_size(
                page,
                &self.settings.dist_root,
                &self.settings.build_id,
                manifest,
                self.settings.variant,
            )
        }))
        .await;

        let mut report = BTreeMap::new();
        for (page, size) in pages.iter().zip(sizes) {
            let info = self.classify_sized(page, size).await?;
            report.insert(page.clone(), info);
        }

        Ok(BuildReport {
            pages: report,
            shared: shared.as_ref().clone(),
        })
    }

    /// Whether the project's `_app` overrides `getInitialProps`.
    pub async fn has_custom_app_initial_props(&self) -> Result<bool> {
        self.classifier
            .has_custom_app_initial_props(
                &self.server_bundle("/_app"),
                &self.settings.runtime_config,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ArtifactDescriptor, LoadError};
    use async_trait::async_trait;

    struct NoBundles;

    #[async_trait]
    impl ArtifactLoader for NoBundles {
        async fn load(
            &self,
            bundle: &Path,
        ) -> std::result::Result<ArtifactDescriptor, LoadError> {
            Err(LoadError::NotFound(bundle.to_path_buf()))
        }
    }

    struct FixedSizer;

    #[async_trait]
    impl ContentSizer for FixedSizer {
        async fn compressed_size(&self, _path: &Path) -> std::io::Result<u64> {
            Ok(100)
        }
    }

    fn pass() -> ReportPass {
        ReportPass::new(
            PassSettings {
                dist_root: PathBuf::from("/app/.next"),
                build_id: "b1".to_string(),
                variant: Variant::Legacy,
                runtime_config: serde_json::Value::Null,
            },
            Arc::new(FixedSizer),
            ArtifactClassifier::with_loader(Arc::new(NoBundles)),
        )
    }

    #[test]
    fn test_server_bundle_path() {
        let pass = pass();
        assert_eq!(
            pass.server_bundle("/"),
            PathBuf::from("/app/.next/server/static/b1/pages/index.js")
        );
        assert_eq!(
            pass.server_bundle("/posts/[id]"),
            PathBuf::from("/app/.next/server/static/b1/pages/posts/[id].js")
        );
    }

    #[tokio::test]
    async fn test_missing_bundle_is_dynamic_and_not_prerendered() {
        let manifest = BuildManifest::from_json(
            r#"{"pages":{"/":["static/main.js"],"/about":["static/main.js","static/about.js"]}}"#,
        )
        .unwrap();

        let info = pass().page_info("/about", &manifest).await.unwrap();

        // about.js plus the entry bundle; main.js is shared.
        assert_eq!(info.size, PageSize::Known(200));
        assert!(!info.is_static);
        assert!(!info.is_prerendered);
        assert_eq!(info.prerender_paths, None);
    }

    #[tokio::test]
    async fn test_shared_summary_sizes_each_file() {
        let manifest = BuildManifest::from_json(
            r#"{"pages":{"/":["static/main.js","static/app.js"],"/about":["static/main.js","static/app.js","static/about.js"]}}"#,
        )
        .unwrap();

        let summary = pass().shared_sizes(&manifest).await;

        assert_eq!(summary.total, 200);
        assert_eq!(
            summary.files,
            BTreeMap::from([
                ("static/app.js".to_string(), 100),
                ("static/main.js".to_string(), 100),
            ])
        );
    }
}
