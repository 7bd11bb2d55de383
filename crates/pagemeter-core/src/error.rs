//! Error types for pagemeter.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pagemeter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a report.
///
/// Classification errors are meant to be fixed by the page author, so each
/// one names the offending page. Size lookups never surface here: they
/// degrade to an unknown size instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The page bundle has no usable default export.
    #[error("The default export of page \"{page}\" is not a valid React component")]
    InvalidExport {
        /// Route key of the page.
        page: String,
    },

    /// The page still uses the removed `getStaticParams` export.
    #[error(
        "getStaticParams in page \"{page}\" was replaced with getStaticPaths. Please update your code."
    )]
    DeprecatedApi {
        /// Route key of the page.
        page: String,
    },

    /// The page mixes per-request and build-time data fetching.
    #[error("You can not use getInitialProps with getStaticProps. Please remove one of the methods (page \"{page}\")")]
    ConflictingDataStrategy {
        /// Route key of the page.
        page: String,
    },

    /// `getStaticPaths` was exported where it can not apply.
    #[error(
        "getStaticPaths in page \"{page}\" can only be used with dynamic pages that also export getStaticProps"
    )]
    InvalidStaticPathsUsage {
        /// Route key of the page.
        page: String,
    },

    /// A string path returned from `getStaticPaths` does not match the route.
    #[error("The provided path `{path}` does not match the page: `{page}`.")]
    PathMismatch {
        /// Route key of the page.
        page: String,
        /// The path that failed to match.
        path: String,
    },

    /// A `getStaticPaths` entry is not shaped as `{ params: { ... } }`.
    #[error("{}", params_shape_message(.page, .invalid_keys, .expected_shape, .violation))]
    InvalidParamsShape {
        /// Route key of the page.
        page: String,
        /// Keys that are not allowed where they appeared.
        invalid_keys: Vec<String>,
        /// The shape the entry should have had.
        expected_shape: String,
        /// Where the keys appeared.
        violation: ParamsShapeViolation,
    },

    /// A route parameter was missing or not a string.
    #[error("A required parameter ({param}) was not provided as a string in page \"{page}\".")]
    MissingParam {
        /// Route key of the page.
        page: String,
        /// Name of the parameter.
        param: String,
    },

    /// The artifact loader failed for a reason other than a missing bundle.
    #[error("Failed to load page \"{page}\": {message}")]
    ArtifactLoad {
        /// Route key of the page.
        page: String,
        /// Loader error message.
        message: String,
    },

    /// The page's `getStaticPaths` function itself failed.
    #[error("getStaticPaths failed in page \"{page}\": {message}")]
    StaticPaths {
        /// Route key of the page.
        page: String,
        /// Error message from the provider.
        message: String,
    },

    /// Pattern compilation error (route or page filter regex).
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// A file-system error aborted a directory scan.
    #[error("Failed to scan {}: {source}", .path.display())]
    Scan {
        /// Path whose read or stat failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// TOML parsing error.
    #[error("TOML parse error in {}: {source}", .file.display())]
    TomlError {
        /// Path to the TOML file with the error.
        file: PathBuf,
        /// The underlying TOML parsing error.
        #[source]
        source: toml::de::Error,
    },

    /// JSON parsing error (build manifest, etc.).
    #[error("JSON parse error in {}: {source}", .file.display())]
    JsonError {
        /// Path to the JSON file with the error.
        file: PathBuf,
        /// The underlying JSON parsing error.
        #[source]
        source: serde_json::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a `getStaticPaths` entry strayed from `{ params: { ... } }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsShapeViolation {
    /// Keys next to `params` instead of inside it.
    OutsideParams,
    /// Keys inside `params` that name no route parameter.
    UnknownParams,
}

fn params_shape_message(
    page: &str,
    keys: &[String],
    expected_shape: &str,
    violation: &ParamsShapeViolation,
) -> String {
    let keys = keys.join(", ");
    match violation {
        ParamsShapeViolation::OutsideParams => format!(
            "Additional keys were returned from `getStaticPaths` in page \"{page}\". URL Parameters intended for this dynamic route must be nested under the `params` key, i.e.:\n\n\treturn {expected_shape}\n\nKeys that need moved: {keys}."
        ),
        ParamsShapeViolation::UnknownParams => format!(
            "Unknown parameters were returned from `getStaticPaths` in page \"{page}\": {keys}. The `params` of this dynamic route may only name its own parameters, i.e.:\n\n\treturn {expected_shape}\n"
        ),
    }
}

impl Error {
    /// Route key of the page this error belongs to, if it is a classification error.
    pub fn page(&self) -> Option<&str> {
        match self {
            Error::InvalidExport { page }
            | Error::DeprecatedApi { page }
            | Error::ConflictingDataStrategy { page }
            | Error::InvalidStaticPathsUsage { page }
            | Error::PathMismatch { page, .. }
            | Error::InvalidParamsShape { page, .. }
            | Error::MissingParam { page, .. }
            | Error::ArtifactLoad { page, .. }
            | Error::StaticPaths { page, .. } => Some(page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_params_shape_message() {
        let err = Error::InvalidParamsShape {
            page: "/posts/[id]".to_string(),
            invalid_keys: vec!["slug".to_string(), "extra".to_string()],
            expected_shape: "{ params: { id: ... } }".to_string(),
            violation: ParamsShapeViolation::OutsideParams,
        };

        let message = err.to_string();
        assert!(message.contains("\"/posts/[id]\""));
        assert!(message.contains("return { params: { id: ... } }"));
        assert!(message.contains("Keys that need moved: slug, extra."));
    }

    #[test]
    fn test_unknown_params_message() {
        let err = Error::InvalidParamsShape {
            page: "/posts/[id]".to_string(),
            invalid_keys: vec!["slug".to_string()],
            expected_shape: "{ params: { id: ... } }".to_string(),
            violation: ParamsShapeViolation::UnknownParams,
        };

        let message = err.to_string();
        assert!(message.starts_with("Unknown parameters were returned"));
        assert!(message.contains("\"/posts/[id]\": slug."));
        assert!(message.contains("return { params: { id: ... } }"));
        assert!(!message.contains("need moved"));
        assert!(!message.contains("nested under"));
    }

    #[test]
    fn test_page_accessor() {
        let err = Error::MissingParam {
            page: "/posts/[id]".to_string(),
            param: "id".to_string(),
        };
        assert_eq!(err.page(), Some("/posts/[id]"));

        let err = Error::InvalidConfig {
            message: "bad".to_string(),
        };
        assert_eq!(err.page(), None);
    }
}
