//! Result and error types for pagekit.

use crate::locator::LocatorError;
use thiserror::Error;

/// Result type for pagekit operations
pub type PagekitResult<T> = Result<T, PagekitError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum PagekitError {
    /// Locator resolved to zero nodes within the timeout
    #[error("No node matched {xpath} within {elapsed_ms}ms")]
    NotFound {
        /// XPath that was resolved
        xpath: String,
        /// Time spent looking
        elapsed_ms: u64,
    },

    /// A previously located node is no longer attached to the document
    #[error("Stale element: node for {xpath} is detached from the document")]
    StaleElement {
        /// XPath the node was located with
        xpath: String,
    },

    /// A wait condition never became true
    #[error("Timed out after {elapsed_ms}ms waiting for {description}")]
    Timeout {
        /// What was waited for
        description: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// A typed wrapper resolved a node of the wrong shape
    #[error("Wrong element kind at {xpath}: expected {expected}, found {found}")]
    WrongKind {
        /// XPath of the node
        xpath: String,
        /// Expected kind
        expected: String,
        /// What the node actually is
        found: String,
    },

    /// A bounded retry loop ran out of attempts
    #[error("{action} did not take effect after {attempts} attempts: {xpath}")]
    RetriesExhausted {
        /// Action being retried
        action: String,
        /// XPath of the target node
        xpath: String,
        /// Attempts made
        attempts: u32,
    },

    /// Operation on an element handle after `dispose()`
    #[error("Element handle for {xpath} was disposed")]
    Disposed {
        /// XPath of the handle
        xpath: String,
    },

    /// Locator query violates the builder contract
    #[error("Invalid locator: {0}")]
    Locator(#[from] LocatorError),

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Driver-level failure (protocol error, evaluation error)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl PagekitError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(description: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            description: description.into(),
            elapsed_ms,
        }
    }

    /// True for errors that mean "the node is not there (any more)"
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::StaleElement { .. } | Self::Timeout { .. }
        )
    }
}
