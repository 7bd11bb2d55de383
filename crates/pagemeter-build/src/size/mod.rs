//! Compressed bundle sizes.
//!
//! - `oracle`: memoized per-file compressed size lookups
//! - `shared`: the files every page loads, sized once per manifest
//! - `page`: what each page adds on top of the shared files
//!
//! Size lookups fail soft: a failed lookup never becomes an [`Error`], it
//! degrades the shared set to an empty aggregate or a page to
//! [`PageSize::Unknown`].
//!
//! [`Error`]: pagemeter_core::Error
//! [`PageSize::Unknown`]: pagemeter_core::PageSize::Unknown

pub mod oracle;
pub mod page;
pub mod shared;

pub use oracle::{gzip_len, ContentSizer, GzipSizer, SizeLookupError, SizeOracle};
pub use page::{entry_bundle_path, page_file_stem, PageSizeCalculator};
pub use shared::{shared_files, ManifestSizeEngine};
