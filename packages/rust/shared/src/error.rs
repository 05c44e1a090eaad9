//! Error types for serpcluster.
//!
//! Library crates use [`SerpClusterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all serpcluster operations.
#[derive(Debug, thiserror::Error)]
pub enum SerpClusterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the search provider or a page.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad parameter, malformed value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The caller supplied an unusable query. Raised before any I/O.
    #[error("{message}")]
    Input { message: String },

    /// The search provider returned no usable result URLs.
    #[error("no links found")]
    NoResults,

    /// The aggregated keyword set could not be clustered.
    #[error(transparent)]
    Clustering(#[from] ClusterError),
}

/// Failure modes of the cluster engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClusterError {
    /// The keyword set was empty; nothing was vectorized.
    #[error("no keywords")]
    NoKeywords,

    /// Vectorization produced an empty vocabulary.
    #[error("not enough unique keywords")]
    NotEnoughUniqueKeywords,

    /// A cluster count of zero was requested.
    #[error("cluster count must be at least 1")]
    InvalidClusterCount,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SerpClusterError>;

impl SerpClusterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an input error from any displayable message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was caused by the caller rather than by the run itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Input { .. } | Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SerpClusterError::config("cluster_count is not set");
        assert_eq!(err.to_string(), "config error: cluster_count is not set");

        let err = SerpClusterError::NoResults;
        assert_eq!(err.to_string(), "no links found");
    }

    #[test]
    fn cluster_errors_keep_their_message() {
        let err: SerpClusterError = ClusterError::NoKeywords.into();
        assert_eq!(err.to_string(), "no keywords");

        let err: SerpClusterError = ClusterError::NotEnoughUniqueKeywords.into();
        assert_eq!(err.to_string(), "not enough unique keywords");
    }

    #[test]
    fn client_errors_are_distinguished() {
        assert!(SerpClusterError::input("no query provided").is_client_error());
        assert!(SerpClusterError::validation("bad").is_client_error());
        assert!(!SerpClusterError::NoResults.is_client_error());
        assert!(!SerpClusterError::from(ClusterError::NoKeywords).is_client_error());
        assert!(!SerpClusterError::Storage("locked".into()).is_client_error());
    }
}
