//! Error types for jarprep
//!
//! All modules use `PrepResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for jarprep operations
pub type PrepResult<T> = Result<T, PrepError>;

/// All errors that can occur in jarprep
#[derive(Error, Debug)]
pub enum PrepError {
    // Command line errors
    #[error("Argument parsing failed: {0}")]
    ArgumentParsing(String),

    #[error("Invalid configuration entry {entry}: {reason}")]
    InvalidConfigEntry { entry: String, reason: String },

    // Cache errors
    #[error("Cache failure: {context}")]
    CacheInfrastructure {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Artifact errors
    #[error("Unresolvable dependency for {artifact}: {reason}")]
    UnresolvableDependency { artifact: PathBuf, reason: String },

    #[error("Signed artifact refused by signed jar handling strategy: {0}")]
    SignedArtifactAbort(PathBuf),

    #[error("Invalid archive {path}: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Transform failed for {artifact}: {reason}")]
    Transform { artifact: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid config entry error
    pub fn invalid_entry(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfigEntry {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Create a cache infrastructure error wrapping an underlying cause
    pub fn cache(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::CacheInfrastructure {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache infrastructure error without an underlying cause
    pub fn cache_msg(context: impl Into<String>) -> Self {
        Self::CacheInfrastructure {
            context: context.into(),
            source: None,
        }
    }

    /// Check if the error happened before any work could start
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ArgumentParsing(_) | Self::InvalidConfigEntry { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ArgumentParsing(_) => Some("Run: jarprep --help"),
            Self::InvalidConfigEntry { .. } => {
                Some("Check the flag value; see jarprep --help for accepted values")
            }
            Self::CacheInfrastructure { .. } => {
                Some("Check permissions on the cache directory or rerun with --cachestrategy none")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PrepError::invalid_entry("--workers", "must be a positive integer");
        assert!(err.to_string().contains("--workers"));
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn error_hint() {
        let err = PrepError::ArgumentParsing("no arguments".to_string());
        assert_eq!(err.hint(), Some("Run: jarprep --help"));
        assert!(PrepError::Internal("x".to_string()).hint().is_none());
    }

    #[test]
    fn cache_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PrepError::cache("writing manifest", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(PrepError::cache_msg("corrupt").to_string().contains("corrupt"));
    }

    #[test]
    fn configuration_errors() {
        assert!(PrepError::ArgumentParsing("x".into()).is_configuration_error());
        assert!(!PrepError::cache_msg("x").is_configuration_error());
    }
}
