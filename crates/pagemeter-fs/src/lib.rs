//! Filesystem abstraction and directory scanning for pagemeter.
//!
//! This crate provides a `FileSystem` trait with a native implementation
//! (`std::fs` on tokio's blocking pool) and an in-memory one, plus the
//! overlay-aware recursive [`scan`] used to discover page sources.
//!
//! # Example
//!
//! ```no_run
//! use pagemeter_fs::{scan, NativeFileSystem};
//! use regex::Regex;
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = NativeFileSystem::new(".")?;
//! let filter = Regex::new(r"\.(?:tsx|ts|jsx|js)$")?;
//! let pages = scan(&fs, &[PathBuf::from("pages")], &filter, None).await?;
//! for page in pages {
//!     println!("{}", page);
//! }
//! # Ok(())
//! # }
//! ```

mod file_system;
pub use file_system::{FileMetadata, FileSystem};

pub mod scan;
pub use scan::{scan, ScanError};

#[cfg(feature = "native")]
pub mod native;
#[cfg(feature = "native")]
pub use native::NativeFileSystem;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "memory")]
pub use memory::MemoryFileSystem;

#[cfg(feature = "native")]
pub use NativeFileSystem as DefaultFileSystem;

#[cfg(all(not(feature = "native"), feature = "memory"))]
pub use MemoryFileSystem as DefaultFileSystem;
