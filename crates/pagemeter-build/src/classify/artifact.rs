//! What a compiled page bundle exports, and how to load it.

use async_trait::async_trait;
use pagemeter_fs::FileSystem;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Shape of a bundle's default export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultExport {
    /// No default export at all.
    Missing,
    /// A renderable component.
    #[default]
    Component,
    /// A bare string (an intrinsic element name, not a page).
    String,
    /// Something that can not be rendered.
    NotRenderable,
}

/// The `amp` setting of a page's exported config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmpMode {
    /// No AMP.
    #[default]
    Off,
    /// Both an AMP and a regular version are served.
    Hybrid,
    /// AMP only.
    Pure,
}

/// A page's exported `config` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// AMP mode.
    #[serde(default)]
    pub amp: AmpMode,
}

/// One element of what `getStaticPaths` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StaticPathEntry {
    /// A concrete path such as `/posts/1`.
    Path(String),
    /// An object, expected to be `{ "params": { ... } }`.
    Object(Map<String, Value>),
}

impl StaticPathEntry {
    /// Entry of the form `{ "params": params }`.
    pub fn params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let params: Map<String, Value> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let mut entry = Map::new();
        entry.insert("params".to_string(), Value::Object(params));
        StaticPathEntry::Object(entry)
    }
}

/// Error type of a failing static-paths provider.
pub type ProviderError = Box<dyn StdError + Send + Sync>;

/// The page's `getStaticPaths` function.
#[async_trait]
pub trait StaticPathsProvider: Send + Sync {
    /// Paths to prerender, in declaration order.
    async fn static_paths(&self) -> Result<Vec<StaticPathEntry>, ProviderError>;
}

#[async_trait]
impl StaticPathsProvider for Vec<StaticPathEntry> {
    async fn static_paths(&self) -> Result<Vec<StaticPathEntry>, ProviderError> {
        Ok(self.clone())
    }
}

/// Capabilities a compiled page bundle exposes.
#[derive(Clone, Default)]
pub struct ArtifactDescriptor {
    /// Default export of the bundle.
    pub default_export: DefaultExport,
    /// The component defines `getInitialProps`.
    pub has_initial_props: bool,
    /// The bundle exports `getStaticProps`.
    pub has_static_props: bool,
    /// The bundle exports `getStaticPaths`.
    pub static_paths: Option<Arc<dyn StaticPathsProvider>>,
    /// The bundle exports the removed `getStaticParams`.
    pub has_legacy_static_params: bool,
    /// For the `_app` bundle: `getInitialProps` differs from the framework default.
    pub app_initial_props_overridden: bool,
    /// Exported page config.
    pub config: ArtifactConfig,
}

impl ArtifactDescriptor {
    /// A plain component page with no data requirements.
    pub fn component() -> Self {
        Self::default()
    }

    /// Attaches a static-paths provider.
    pub fn with_static_paths(mut self, provider: impl StaticPathsProvider + 'static) -> Self {
        self.static_paths = Some(Arc::new(provider));
        self
    }
}

impl fmt::Debug for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactDescriptor")
            .field("default_export", &self.default_export)
            .field("has_initial_props", &self.has_initial_props)
            .field("has_static_props", &self.has_static_props)
            .field("has_static_paths", &self.static_paths.is_some())
            .field("has_legacy_static_params", &self.has_legacy_static_params)
            .field("app_initial_props_overridden", &self.app_initial_props_overridden)
            .field("config", &self.config)
            .finish()
    }
}

/// Why a bundle could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bundle does not exist. Classification treats the page as not applicable.
    #[error("bundle not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The bundle exists but could not be evaluated.
    #[error("{0}")]
    Failed(String),
}

/// Loads the capabilities of a compiled server bundle.
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    /// Describes the bundle at `bundle`.
    async fn load(&self, bundle: &Path) -> Result<ArtifactDescriptor, LoadError>;
}

/// Receives the runtime configuration before any bundle is loaded.
pub trait RuntimeConfigInjector: Send + Sync {
    /// Installs `config` for subsequent loads.
    fn set_config(&self, config: &Value);
}

/// Runtime configuration slot that loaders can read from.
#[derive(Debug, Clone, Default)]
pub struct SharedRuntimeConfig {
    inner: Arc<RwLock<Value>>,
}

impl SharedRuntimeConfig {
    /// An empty (`null`) slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration most recently installed.
    pub fn current(&self) -> Value {
        self.inner.read().clone()
    }
}

impl RuntimeConfigInjector for SharedRuntimeConfig {
    fn set_config(&self, config: &Value) {
        *self.inner.write() = config.clone();
    }
}

/// Runtime config injector that drops the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRuntimeConfig;

impl RuntimeConfigInjector for NoRuntimeConfig {
    fn set_config(&self, _config: &Value) {}
}

/// Suffix of the capability sidecar written next to a server bundle.
pub const CAPABILITIES_SUFFIX: &str = ".capabilities.json";

/// On-disk form of a capability sidecar.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CapabilitiesFile {
    default_export: DefaultExport,
    get_initial_props: bool,
    get_static_props: bool,
    get_static_paths: Option<Vec<StaticPathEntry>>,
    get_static_params: bool,
    app_initial_props_overridden: bool,
    config: ArtifactConfig,
}

impl From<CapabilitiesFile> for ArtifactDescriptor {
    fn from(file: CapabilitiesFile) -> Self {
        ArtifactDescriptor {
            default_export: file.default_export,
            has_initial_props: file.get_initial_props,
            has_static_props: file.get_static_props,
            static_paths: file
                .get_static_paths
                .map(|paths| Arc::new(paths) as Arc<dyn StaticPathsProvider>),
            has_legacy_static_params: file.get_static_params,
            app_initial_props_overridden: file.app_initial_props_overridden,
            config: file.config,
        }
    }
}

/// Loads descriptors from `<bundle>.capabilities.json` sidecars.
///
/// A build step that can evaluate bundles writes the sidecar, e.g.
///
/// ```json
/// { "getStaticProps": true, "getStaticPaths": [{ "params": { "id": "1" } }] }
/// ```
///
/// A missing sidecar means the bundle is missing.
pub struct DescriptorFileLoader<F: FileSystem> {
    fs: Arc<F>,
}

impl<F: FileSystem> DescriptorFileLoader<F> {
    /// Loader reading sidecars through `fs`.
    pub fn new(fs: Arc<F>) -> Self {
        Self { fs }
    }

    /// Sidecar path of `bundle`.
    pub fn sidecar_path(bundle: &Path) -> PathBuf {
        let mut name = bundle.as_os_str().to_os_string();
        name.push(CAPABILITIES_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl<F: FileSystem> ArtifactLoader for DescriptorFileLoader<F> {
    async fn load(&self, bundle: &Path) -> Result<ArtifactDescriptor, LoadError> {
        let sidecar = Self::sidecar_path(bundle);
        let contents = match self.fs.read_to_string(&sidecar).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(bundle.to_path_buf()))
            }
            Err(e) => return Err(LoadError::Failed(format!("{}: {}", sidecar.display(), e))),
        };

        let file: CapabilitiesFile = serde_json::from_str(&contents)
            .map_err(|e| LoadError::Failed(format!("{}: {}", sidecar.display(), e)))?;

        Ok(file.into())
    }
}
