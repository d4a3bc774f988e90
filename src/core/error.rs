//! Error handling for storefront-refs
//!
//! This module provides the error types and user-friendly error reporting for
//! the crate. It follows two principles:
//! 1. **Strongly-typed errors** ([`RefsError`]) for precise handling in code
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for CLI users
//!
//! # Error Categories
//!
//! - **Lookup**: [`RefsError::LookupTransport`], [`RefsError::LookupStatus`],
//!   [`RefsError::LookupTimeout`], [`RefsError::LookupDecode`]. These never
//!   escape [`ReferenceCache::resolve`](crate::resolver::ReferenceCache::resolve);
//!   they surface only from the transport layer itself.
//! - **Configuration**: [`RefsError::ConfigError`], [`RefsError::MissingEndpoint`]
//! - **Payloads**: [`RefsError::PayloadError`]
//! - **Conversions**: [`std::io::Error`], [`serde_json::Error`] and
//!   [`toml::de::Error`] convert automatically.
//!
//! # Examples
//!
//! ```rust,no_run
//! use storefront_refs::core::{RefsError, ErrorContext, user_friendly_error};
//!
//! let context = ErrorContext::new(RefsError::MissingEndpoint)
//!     .with_suggestion("Pass --endpoint or set [lookup] endpoint in config.toml");
//! context.display();
//!
//! let friendly = user_friendly_error(anyhow::Error::from(RefsError::MissingEndpoint));
//! println!("{friendly}");
//! ```

use colored::Colorize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for storefront-refs operations.
///
/// Variants carry owned strings rather than source errors so the type stays
/// `Clone` and can be re-wrapped into an [`ErrorContext`] after downcasting.
#[derive(Error, Debug, Clone)]
pub enum RefsError {
    /// The lookup request could not be sent or the connection failed.
    #[error("Catalog lookup to {endpoint} failed: {reason}")]
    LookupTransport {
        /// Lookup endpoint URL
        endpoint: String,
        /// Underlying transport error
        reason: String,
    },

    /// The lookup endpoint answered with a non-success status.
    #[error("Catalog lookup to {endpoint} returned HTTP {status}")]
    LookupStatus {
        /// Lookup endpoint URL
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// The lookup did not complete in time.
    #[error("Catalog lookup to {endpoint} timed out after {}s", timeout.as_secs_f64())]
    LookupTimeout {
        /// Lookup endpoint URL
        endpoint: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// The lookup response body was not the expected JSON shape.
    #[error("Catalog lookup to {endpoint} returned an unreadable body: {reason}")]
    LookupDecode {
        /// Lookup endpoint URL
        endpoint: String,
        /// Decoding failure
        reason: String,
    },

    /// No lookup endpoint was configured.
    #[error("No catalog lookup endpoint configured")]
    MissingEndpoint,

    /// The configuration file is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// A payload file could not be read or parsed.
    #[error("Invalid payload {path}: {reason}")]
    PayloadError {
        /// Payload file path
        path: String,
        /// Read or parse failure
        reason: String,
    },

    /// I/O error.
    #[error("IO error: {0}")]
    IoError(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// TOML parsing error.
    #[error("TOML parsing error: {0}")]
    TomlError(String),
}

impl From<std::io::Error> for RefsError {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for RefsError {
    fn from(error: serde_json::Error) -> Self {
        Self::JsonError(error.to_string())
    }
}

impl From<toml::de::Error> for RefsError {
    fn from(error: toml::de::Error) -> Self {
        Self::TomlError(error.to_string())
    }
}

impl RefsError {
    /// Whether this error came from the lookup transport.
    #[must_use]
    pub const fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::LookupTransport { .. }
                | Self::LookupStatus { .. }
                | Self::LookupTimeout { .. }
                | Self::LookupDecode { .. }
        )
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Wraps a [`RefsError`] with an optional suggestion (shown in green) and
/// optional details (shown in yellow) for display in the terminal.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: RefsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: RefsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

fn create_error_context(error: RefsError) -> ErrorContext {
    let (suggestion, details) = match &error {
        RefsError::MissingEndpoint => (
            Some("Pass --endpoint <URL> or set `endpoint` under [lookup] in ~/.sfrefs/config.toml"),
            Some("The resolver needs the URL of the catalog batch lookup endpoint"),
        ),
        RefsError::ConfigError { .. } | RefsError::TomlError(_) => (
            Some("Check the TOML syntax and field names in your config.toml"),
            Some("Expected a [lookup] table with endpoint, timeout_secs and headers"),
        ),
        RefsError::PayloadError { .. } | RefsError::JsonError(_) => {
            (Some("Make sure the file exists and contains a single JSON document"), None)
        }
        RefsError::LookupTimeout { .. } => {
            (Some("Increase timeout_secs in config.toml or pass a larger --timeout"), None)
        }
        RefsError::LookupStatus { status: 401 | 403, .. } => {
            (Some("Check the API key header configured under [lookup.headers]"), None)
        }
        RefsError::LookupTransport { .. } | RefsError::LookupStatus { .. } => {
            (Some("Verify the endpoint URL and that the catalog service is reachable"), None)
        }
        _ => (None, None),
    };

    ErrorContext {
        error,
        suggestion: suggestion.map(str::to_string),
        details: details.map(str::to_string),
    }
}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Recognizes [`RefsError`], I/O, JSON and TOML errors anywhere in the chain;
/// anything else is reported with its full context chain as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(refs_error) = cause.downcast_ref::<RefsError>() {
            let mut context = create_error_context(refs_error.clone());
            if context.details.is_none() && error.chain().count() > 1 {
                context.details = Some(error.to_string());
            }
            return context;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        let ctx = ErrorContext::new(RefsError::IoError(io_error.to_string()));
        return match io_error.kind() {
            std::io::ErrorKind::NotFound => ctx
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details(format!("{error:#}")),
            std::io::ErrorKind::PermissionDenied => ctx
                .with_suggestion("Check file ownership and permissions")
                .with_details(format!("{error:#}")),
            _ => ctx.with_details(format!("{error:#}")),
        };
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return create_error_context(RefsError::JsonError(json_error.to_string()))
            .with_details(format!("{error:#}"));
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return create_error_context(RefsError::TomlError(toml_error.to_string()));
    }

    let root = error.root_cause().to_string();
    ErrorContext::new(RefsError::IoError(root)).with_details(format!("{error:#}"))
}
