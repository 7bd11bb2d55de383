//! Core data types for build reports.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Manifest key of the virtual polyfills entry. It is not a page.
pub const POLYFILLS_KEY: &str = "/_polyfills";

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Opaque identity token handed out to every [`BuildManifest`] on construction.
///
/// Two manifests with identical content still get different generations, so
/// caches keyed by generation never confuse one manifest instance with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManifestGeneration(u64);

impl ManifestGeneration {
    fn next() -> Self {
        Self(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }
}

/// The `build-manifest.json` shape as written by the compiler.
#[derive(Debug, Default, Deserialize, Serialize)]
struct RawBuildManifest {
    #[serde(default)]
    pages: BTreeMap<String, Vec<String>>,
}

/// Page route key -> ordered dependency files, as produced by the compiler.
///
/// A manifest is immutable. It is deliberately not `Clone`: share it through
/// an `Arc` so its [`ManifestGeneration`] keeps meaning "this instance".
#[derive(Debug)]
pub struct BuildManifest {
    generation: ManifestGeneration,
    pages: BTreeMap<String, Vec<String>>,
}

impl BuildManifest {
    /// Creates a manifest with a fresh generation.
    pub fn new(pages: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            generation: ManifestGeneration::next(),
            pages,
        }
    }

    /// Parses a `build-manifest.json` document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: RawBuildManifest = serde_json::from_str(json)?;
        Ok(Self::new(raw.pages))
    }

    /// Identity token of this instance.
    pub fn generation(&self) -> ManifestGeneration {
        self.generation
    }

    /// All entries, including the virtual polyfills entry.
    pub fn pages(&self) -> &BTreeMap<String, Vec<String>> {
        &self.pages
    }

    /// Dependencies of one page, empty if the page is unknown.
    pub fn dependencies(&self, page: &str) -> &[String] {
        self.pages.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries that count as real pages (everything but the polyfills entry).
    pub fn counted_pages(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.pages.iter().filter(|(key, _)| key.as_str() != POLYFILLS_KEY)
    }
}

/// Which bundle flavour a report is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Bundles for modern browsers (`*.module.js`).
    Modern,
    /// Bundles for legacy browsers (every other `*.js`).
    #[default]
    Legacy,
}

impl Variant {
    /// Returns true for files that take part in size computations at all.
    pub fn is_script(file: &str) -> bool {
        file.ends_with(".js")
    }

    /// Returns true if `file` is a script belonging to this variant.
    pub fn owns(self, file: &str) -> bool {
        Self::is_script(file) && file.ends_with(".module.js") == (self == Variant::Modern)
    }

    /// Suffix of the page entry bundle for this variant.
    pub fn bundle_suffix(self) -> &'static str {
        match self {
            Variant::Modern => ".module.js",
            Variant::Legacy => ".js",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Modern => f.write_str("modern"),
            Variant::Legacy => f.write_str("legacy"),
        }
    }
}

/// Compressed size of one page, or unknown if any lookup failed.
///
/// Serialized as a number, with `-1` standing for unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    /// Total compressed bytes.
    Known(u64),
    /// At least one dependency could not be sized.
    Unknown,
}

impl PageSize {
    /// The sentinel form: bytes, or `-1` for unknown.
    pub fn as_sentinel(self) -> i64 {
        match self {
            PageSize::Known(bytes) => i64::try_from(bytes).unwrap_or(i64::MAX),
            PageSize::Unknown => -1,
        }
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_sentinel())
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(u64::try_from(raw).map_or(PageSize::Unknown, PageSize::Known))
    }
}

/// Files shared by every page, and what they weigh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSizes {
    /// Shared files in first-seen manifest order.
    pub files: Vec<String>,

    /// Compressed size per shared file. Empty if any lookup failed.
    pub size_per_file: BTreeMap<String, u64>,

    /// Sum of `size_per_file`.
    pub total: u64,
}

/// Rendering strategy facts for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageClassification {
    /// Rendered to HTML at build time without any data requirement.
    pub is_static: bool,

    /// The page opts into hybrid AMP.
    pub is_hybrid_amp: bool,

    /// Concrete paths declared by `getStaticPaths`, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerender_paths: Option<Vec<String>>,

    /// The page fetches its data at build time.
    pub is_prerendered: bool,
}

/// Everything the report renderer needs to know about one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Exclusive compressed size of the page.
    pub size: PageSize,

    /// See [`PageClassification::is_static`].
    pub is_static: bool,

    /// See [`PageClassification::is_prerendered`].
    pub is_prerendered: bool,

    /// Hybrid AMP page.
    #[serde(default)]
    pub is_amp: bool,

    /// See [`PageClassification::prerender_paths`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerender_paths: Option<Vec<String>>,

    /// Server bundle the page was classified from.
    pub server_bundle: PathBuf,
}

/// Output of one reporting pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Per-page facts keyed by route.
    pub pages: BTreeMap<String, PageInfo>,

    /// The baseline shared by every page.
    pub shared: SharedSizes,
}
