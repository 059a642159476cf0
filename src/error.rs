//! Error types for Bazelisk
//!
//! All modules use `BazeliskResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Bazelisk operations
pub type BazeliskResult<T> = Result<T, BazeliskError>;

/// All errors that can occur in Bazelisk
#[derive(Error, Debug)]
pub enum BazeliskError {
    // Version specification errors
    #[error("Invalid version specification \"{spec}\": {reason}")]
    InvalidSpecFormat { spec: String, reason: String },

    #[error("Invalid version \"{0}\": expected <major>.<minor>[.<patch>]")]
    InvalidVersion(String),

    #[error("Cannot resolve \"latest-{offset}\": only {available} release(s) are known")]
    OffsetOutOfRange { offset: usize, available: usize },

    #[error("Unexpected entry in release bucket \"{entry}\": {reason}")]
    MalformedCatalogEntry { entry: String, reason: String },

    // Network errors
    #[error("Could not fetch {description} from {url}: {reason}")]
    MetadataFetch {
        description: String,
        url: String,
        reason: String,
    },

    #[error("Could not download {url}: {reason}")]
    Download { url: String, reason: String },

    // Environment errors
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Source build errors
    #[error("Source build failed while {step}:\n{output}")]
    SourceBuild { step: String, output: String },

    // Process errors
    #[error("Could not launch {path}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BazeliskError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a source build error carrying the command's combined output
    pub fn source_build(step: impl Into<String>, output: impl Into<String>) -> Self {
        Self::SourceBuild {
            step: step.into(),
            output: output.into(),
        }
    }

    /// Check if a later run may succeed without any user action
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MetadataFetch { .. } | Self::Download { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MetadataFetch { .. } => {
                Some("Set BAZELISK_GITHUB_TOKEN if the GitHub API is rate limiting you")
            }
            Self::UnsupportedPlatform(_) => {
                Some("Point USE_BAZEL_VERSION at a locally built Bazel binary instead")
            }
            Self::InvalidSpecFormat { .. } => {
                Some("Use <version>, <fork>/<version> or <fork>/commit/<sha>")
            }
            Self::OffsetOutOfRange { .. } => Some("Use a smaller offset, e.g. latest-1"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BazeliskError::OffsetOutOfRange {
            offset: 4,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cannot resolve \"latest-4\": only 3 release(s) are known"
        );
    }

    #[test]
    fn error_hint() {
        let err = BazeliskError::UnsupportedPlatform("mips".to_string());
        assert!(err.hint().unwrap().contains("USE_BAZEL_VERSION"));
        assert!(BazeliskError::Internal("x".to_string()).hint().is_none());
    }

    #[test]
    fn error_retryable() {
        let err = BazeliskError::Download {
            url: "https://example.com".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!BazeliskError::InvalidVersion("x".to_string()).is_retryable());
    }

    #[test]
    fn source_build_error_surfaces_output() {
        let err = BazeliskError::source_build("fetching abc123", "fatal: bad object");
        assert!(err.to_string().contains("fatal: bad object"));
    }
}
