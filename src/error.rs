//! Error types for docsieve.
//!
//! All fallible operations return [`Result`], whose error type is
//! [`DocsieveError`]. The variants form a small, closed taxonomy that callers
//! can match on to distinguish "bad file" from "protected file" from
//! "unsupported file":
//!
//! - `UnsupportedFormat` - no extractor resolves for the identifier; nothing
//!   was attempted
//! - `Encrypted` - a pre-parse guard positively detected password protection;
//!   no content is returned, not even partial
//! - `ResourceLimit` - an archive guard threshold tripped; a safety rejection,
//!   not a parse failure
//! - `Parsing` - the container is corrupt or malformed in a way unrelated to
//!   encryption
//! - `ExtractionFailed` - anything else that went wrong during extraction,
//!   wrapped once at the entry boundary with the original cause preserved
//!
//! IO errors bubble up unchanged: they indicate real system problems
//! (permissions, missing files) that users need to see as-is.

use thiserror::Error;

/// Result type alias using `DocsieveError`.
pub type Result<T> = std::result::Result<T, DocsieveError>;

/// Main error type for all docsieve operations.
#[derive(Debug, Error)]
pub enum DocsieveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No extractor is registered for the given identifier.
    ///
    /// Carries the rejected extension or MIME type for diagnostics.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file is encrypted or password-protected.
    #[error("Encrypted content: {message}")]
    Encrypted { message: String },

    /// An archive guard threshold was exceeded (probable resource bomb).
    #[error("Resource limit exceeded: {message}")]
    ResourceLimit { message: String },

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic wrapper applied at the extraction entry boundary.
    #[error("Extraction failed: {message}")]
    ExtractionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DocsieveError {
    /// Create a Parsing error.
    pub fn parsing<S: Into<String>>(message: S) -> Self {
        Self::Parsing {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Parsing error with source.
    pub fn parsing_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parsing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an Encrypted error.
    pub fn encrypted<S: Into<String>>(message: S) -> Self {
        Self::Encrypted {
            message: message.into(),
        }
    }

    /// Create a ResourceLimit error.
    pub fn resource_limit<S: Into<String>>(message: S) -> Self {
        Self::ResourceLimit {
            message: message.into(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error is one of the specific taxonomy conditions that
    /// must pass through the entry boundary unchanged.
    pub fn is_taxonomy_condition(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::Encrypted { .. }
                | Self::ResourceLimit { .. }
                | Self::Parsing { .. }
        )
    }

    /// Wrap a non-taxonomy fault into `ExtractionFailed`, preserving the
    /// cause. Specific conditions pass through untouched so callers never
    /// lose the ability to distinguish them.
    pub fn into_boundary_error(self) -> Self {
        if self.is_taxonomy_condition() {
            return self;
        }
        match self {
            Self::ExtractionFailed { .. } => self,
            other => Self::ExtractionFailed {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<serde_json::Error> for DocsieveError {
    fn from(err: serde_json::Error) -> Self {
        DocsieveError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(any(feature = "office", feature = "excel", feature = "archives"))]
impl From<zip::result::ZipError> for DocsieveError {
    fn from(err: zip::result::ZipError) -> Self {
        DocsieveError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "excel")]
impl From<calamine::Error> for DocsieveError {
    fn from(err: calamine::Error) -> Self {
        DocsieveError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for DocsieveError {
    fn from(err: lopdf::Error) -> Self {
        DocsieveError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
