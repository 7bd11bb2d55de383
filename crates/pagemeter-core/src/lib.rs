//! pagemeter core - shared data model for build reports.
//!
//! This crate holds the types every other pagemeter crate speaks:
//!
//! - [`BuildManifest`]: page -> dependency files, with an identity token
//! - [`Variant`]: modern vs legacy bundle partition
//! - [`PageSize`], [`SharedSizes`]: size facts
//! - [`PageClassification`], [`PageInfo`], [`BuildReport`]: per-page output
//! - [`Error`]: the error taxonomy of a reporting pass
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ pagemeter-build │  (sizes, classification, report pass)
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────┐
//!    ▼            ▼
//! ┌──────────┐ ┌──────────────┐
//! │ -core    │ │ -fs          │  (this crate / filesystem + scanner)
//! └──────────┘ └──────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pagemeter_core::{BuildManifest, Variant};
//!
//! let manifest = BuildManifest::from_json(
//!     r#"{"pages":{"/":["static/runtime/main.js","static/runtime/main.module.js"]}}"#,
//! )?;
//!
//! let modern: Vec<_> = manifest
//!     .dependencies("/")
//!     .iter()
//!     .filter(|file| Variant::Modern.owns(file))
//!     .collect();
//! assert_eq!(modern, ["static/runtime/main.module.js"]);
//! # Ok::<(), serde_json::Error>(())
//! ```

pub mod error;
pub mod types;

// Re-export core types for convenience
pub use error::{Error, ParamsShapeViolation, Result};
pub use types::{
    BuildManifest, BuildReport, ManifestGeneration, PageClassification, PageInfo, PageSize,
    SharedSizes, Variant, POLYFILLS_KEY,
};
