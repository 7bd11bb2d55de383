//! Build output analysis for pagemeter.
//!
//! Given the compiled output of a page-based web app and its build manifest,
//! this crate works out what every page costs and how it renders:
//!
//! - [`size`]: gzip sizes of the files all pages share, and of what each page
//!   adds on top
//! - [`classify`]: static, server-rendered or prerendered, plus the concrete
//!   paths a dynamic page prerenders
//! - [`pages`]: page source discovery
//! - [`report`]: a [`ReportPass`] tying the above together for one build
//!
//! # Example
//!
//! ```no_run
//! use pagemeter_build::classify::{DescriptorFileLoader, SharedRuntimeConfig};
//! use pagemeter_build::{collect_pages, page_route, ReportConfig, ReportPass};
//! use pagemeter_core::BuildManifest;
//! use pagemeter_fs::{FileSystem, NativeFileSystem};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = Path::new(".");
//! let fs = Arc::new(NativeFileSystem::new(root)?);
//! let root = fs.project_root().to_path_buf();
//! let config = ReportConfig::load(fs.as_ref(), &root).await?;
//!
//! let manifest_json = fs
//!     .read_to_string(&config.dist_root(&root).join("build-manifest.json"))
//!     .await?;
//! let manifest = BuildManifest::from_json(&manifest_json)?;
//!
//! let pages: Vec<String> = collect_pages(fs.as_ref(), &config.pages_root(&root), &config.pages.extensions)
//!     .await?
//!     .iter()
//!     .map(|file| page_route(file))
//!     .collect();
//!
//! let loader = Arc::new(DescriptorFileLoader::new(Arc::clone(&fs)));
//! let pass = ReportPass::from_config(fs, &root, &config, loader, Arc::new(SharedRuntimeConfig::new())).await?;
//! let report = pass.run(&pages, &manifest).await?;
//!
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod pages;
pub mod report;
pub mod size;
pub mod toml_config;

pub use classify::ArtifactClassifier;
pub use pages::{collect_pages, page_route};
pub use report::{PassSettings, ReportPass, SharedSummary};
pub use size::{ManifestSizeEngine, PageSizeCalculator, SizeOracle};
pub use toml_config::ReportConfig;
