//! # Error Handling
//!
//! Errors raised by the conforming subsystem, with the metadata callers need to
//! decide what to do with a frame.
//!
//! ## Classification
//!
//! Nothing in this crate retries. Errors fall into three groups:
//!
//! - **Precondition failures** (`Config`, `Validation`): programmer errors such
//!   as a portrait output resolution or a wrongly sized destination buffer.
//! - **Frame failures** (`Scale`): the frame is dropped and the destination
//!   keeps its previous contents.
//! - **Infrastructure failures** (`Gpu`, `Worker`, `Io`, `External`).
//!
//! [`classify::is_fatal`] separates the first and the worker case from the
//! rest; the `conform` binary reports it alongside the recovery suggestion.
//!
//! Skipped frames that are *not* failures (an invalid source image, a shader
//! that is not available yet) are reported through status enums, not errors.
//!
//! ## Usage
//!
//! ```rust
//! use frame_conform::error::{ConformError, ErrorSeverity, HasSeverity};
//!
//! let error = ConformError::validation("output_width", "must exceed output_height", "480")
//!     .with_context("building conform config from CLI")
//!     .with_severity(ErrorSeverity::Fatal);
//!
//! assert_eq!(error.category(), "validation");
//! assert_eq!(error.severity(), ErrorSeverity::Fatal);
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

use conform_scale::ScaleError;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Errors that affect operation but can be recovered from
    Error,
    /// Critical errors that require immediate attention
    Critical,
    /// Fatal errors that cannot be recovered from
    Fatal,
}

/// Core error context containing metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a given severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for the conforming subsystem
#[derive(Debug)]
pub enum ConformError {
    /// Configuration errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Validation errors on caller-supplied values
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// CPU path, crop planning or intrinsics failures
    Scale {
        operation: String,
        source: ScaleError,
        context: ErrorContext,
    },
    /// Graphics device errors
    Gpu {
        operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// The render worker thread is gone or refused the job
    Worker {
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl ConformError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Wrap a CPU-path error
    pub fn scale(operation: impl Into<String>, source: ScaleError) -> Self {
        Self::Scale {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a graphics device error
    pub fn gpu(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Gpu {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a render worker error
    pub fn worker(reason: impl Into<String>) -> Self {
        Self::Worker {
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Critical),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Attach the path an I/O error refers to
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        if let Self::Io { path: p, .. } = &mut self {
            *p = Some(path.into());
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Scale { context, .. } => context,
            Self::Gpu { context, .. } => context,
            Self::Worker { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Scale { context, .. } => context,
            Self::Gpu { context, .. } => context,
            Self::Worker { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::Scale { .. } => "scale",
            Self::Gpu { .. } => "gpu",
            Self::Worker { .. } => "worker",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }
}

impl fmt::Display for ConformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConformError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            ConformError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            ConformError::Scale {
                operation, source, ..
            } => {
                write!(f, "Conversion failed during {}: {}", operation, source)
            }
            ConformError::Gpu {
                operation, reason, ..
            } => {
                write!(f, "GPU error during {}: {}", operation, reason)
            }
            ConformError::Worker { reason, .. } => {
                write!(f, "Render worker error: {}", reason)
            }
            ConformError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            ConformError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
        }
    }
}

impl StdError for ConformError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Scale { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type ConformResult<T> = Result<T, ConformError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for ConformError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ConformError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// A caller bug: the same call will fail again with the same arguments.
    pub fn is_precondition(error: &ConformError) -> bool {
        matches!(
            error,
            ConformError::Config { .. } | ConformError::Validation { .. }
        ) || matches!(
            error,
            ConformError::Scale {
                source: ScaleError::NotLandscape { .. }
                    | ScaleError::BufferSizeMismatch { .. }
                    | ScaleError::UnsupportedOutputFormat(_),
                ..
            }
        )
    }

    /// Check if an error is fatal (cannot be recovered from)
    pub fn is_fatal(error: &ConformError) -> bool {
        is_precondition(error)
            || matches!(error, ConformError::Worker { .. })
            || error.severity() == ErrorSeverity::Fatal
    }
}

/// Error conversion implementations
impl From<std::io::Error> for ConformError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<ScaleError> for ConformError {
    fn from(error: ScaleError) -> Self {
        Self::scale("conform", error)
    }
}

impl From<serde_json::Error> for ConformError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<image::ImageError> for ConformError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ConformError::config("output_height", "720", "must be below output_width");
        assert_eq!(error.category(), "config");
        assert!(classify::is_fatal(&error));
        assert_eq!(error.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn test_error_with_context() {
        let error = ConformError::gpu("resample", "device lost")
            .with_context("conforming frame 42")
            .with_recovery_suggestion("recreate the render worker");

        assert_eq!(error.category(), "gpu");
        assert_eq!(error.recovery_suggestion(), Some("recreate the render worker"));
        assert_eq!(error.context().context.as_deref(), Some("conforming frame 42"));
        assert!(!classify::is_fatal(&error));
    }

    #[test]
    fn test_scale_error_classification() {
        let portrait: ConformError = ScaleError::NotLandscape { w: 480, h: 640 }.into();
        assert!(classify::is_precondition(&portrait));
        assert!(classify::is_fatal(&portrait));
        assert!(portrait.source().is_some());

        let bad_plane: ConformError = ScaleError::PlaneTooSmall { plane: 0, required: 10, actual: 2 }.into();
        assert!(!classify::is_precondition(&bad_plane));
        assert!(!classify::is_fatal(&bad_plane));
    }

    #[test]
    fn test_worker_errors_are_fatal() {
        let error = ConformError::worker("render thread panicked");
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(!classify::is_precondition(&error));
        assert!(classify::is_fatal(&error));
    }

    #[test]
    fn test_io_error_path() {
        let error = ConformError::io(
            "load frame",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        )
        .with_path("/tmp/frame.png");
        assert!(error.to_string().contains("/tmp/frame.png"));
    }
}
