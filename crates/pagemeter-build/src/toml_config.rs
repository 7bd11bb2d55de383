//! TOML configuration types for pagemeter.

use pagemeter_core::{Error, Result, Variant};
use pagemeter_fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = ".pagemeter.toml";

/// File in the dist directory holding the id of the last build.
pub const BUILD_ID_FILE: &str = "BUILD_ID";

/// pagemeter configuration loaded from `.pagemeter.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Where page sources live.
    #[serde(default)]
    pub pages: PagesConfig,

    /// Where the compiled output lives and which variant to report.
    #[serde(default)]
    pub build: BuildConfig,

    /// Runtime configuration installed before page bundles are loaded.
    #[serde(default)]
    pub runtime: toml::Table,
}

/// Page source configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PagesConfig {
    /// Pages directory, relative to the project root.
    #[serde(default = "default_pages_dir")]
    pub dir: PathBuf,

    /// File extensions of page sources, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: default_pages_dir(),
            extensions: default_extensions(),
        }
    }
}

/// Build output configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Compiled output directory, relative to the project root.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Build id. Read from `<dist_dir>/BUILD_ID` when not set.
    #[serde(default)]
    pub build_id: Option<String>,

    /// Bundle variant sizes are reported for.
    #[serde(default)]
    pub variant: Variant,

    /// Gzip level used for size measurement (0-9).
    #[serde(default = "default_gzip_level")]
    pub gzip_level: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            build_id: None,
            variant: Variant::default(),
            gzip_level: default_gzip_level(),
        }
    }
}

impl ReportConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns an error string describing the first invalid value.
    ///
    /// # Examples
    /// ```
    /// use pagemeter_build::toml_config::ReportConfig;
    ///
    /// let mut config = ReportConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.pages.extensions.clear();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.pages.extensions.is_empty() {
            return Err("pages.extensions must not be empty".to_string());
        }
        for ext in &self.pages.extensions {
            let ext = ext.trim_start_matches('.');
            if ext.is_empty() || ext.contains('/') {
                return Err(format!("pages.extensions contains an invalid extension: {:?}", ext));
            }
        }

        if self.build.gzip_level > 9 {
            return Err("build.gzip_level must be between 0 and 9".to_string());
        }

        if let Some(id) = &self.build.build_id {
            if id.trim().is_empty() || id.contains('/') {
                return Err(format!("build.build_id is not a valid build id: {:?}", id));
            }
        }

        Ok(())
    }

    /// Parses and validates a configuration document.
    pub fn from_toml(source: &str, file: &Path) -> Result<Self> {
        let config: ReportConfig = toml::from_str(source).map_err(|source| Error::TomlError {
            file: file.to_path_buf(),
            source,
        })?;

        config
            .validate()
            .map_err(|message| Error::InvalidConfig { message })?;

        Ok(config)
    }

    /// Loads `.pagemeter.toml` from `project_root`, or the defaults if absent.
    pub async fn load<F>(fs: &F, project_root: &Path) -> Result<Self>
    where
        F: FileSystem + ?Sized,
    {
        let path = project_root.join(CONFIG_FILE_NAME);
        if !fs.exists(&path).await? {
            debug!(file = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let source = fs.read_to_string(&path).await?;
        debug!(file = %path.display(), "loaded configuration");
        Self::from_toml(&source, &path)
    }

    /// The `[runtime]` table as JSON.
    pub fn runtime_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.runtime).unwrap_or_default()
    }

    /// Absolute dist directory.
    pub fn dist_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.build.dist_dir)
    }

    /// Absolute pages directory.
    pub fn pages_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.pages.dir)
    }

    /// The configured build id, or the one recorded in the dist directory.
    pub async fn resolve_build_id<F>(&self, fs: &F, project_root: &Path) -> Result<String>
    where
        F: FileSystem + ?Sized,
    {
        if let Some(id) = &self.build.build_id {
            return Ok(id.clone());
        }

        let path = self.dist_root(project_root).join(BUILD_ID_FILE);
        let id = match fs.read_to_string(&path).await {
            Ok(id) => id.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "No build.build_id configured and {} does not exist",
                        path.display()
                    ),
                })
            }
            Err(e) => return Err(Error::Io(e)),
        };

        if id.is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("{} is empty", path.display()),
            });
        }
        Ok(id)
    }
}

fn default_pages_dir() -> PathBuf {
    PathBuf::from("pages")
}

fn default_extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js"].iter().map(|s| s.to_string()).collect()
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from(".next")
}

fn default_gzip_level() -> u32 {
    9
}
