//! Error handling for the oasforge compilation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! Fatal conditions are always surfaced as `Err` values; the library never
//! terminates the process. Recoverable findings (unsupported formats, skipped
//! reference parameters) are logged as warnings instead.
//!
//! # Examples
//!
//! ```
//! use oasforge_core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     // Operations that might fail...
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type for oasforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type returned by user-supplied hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for user-supplied hooks.
pub type HookResult<T> = std::result::Result<T, HookError>;

/// Main error type for oasforge operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `$ref` string that has no entry in the reference map
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    /// A schema node that cannot be compiled into a type descriptor
    #[error("Schema compilation error: {0}")]
    SchemaCompilation(String),

    /// A document transformation ran against a document missing a required section
    #[error("Pipeline precondition failed: {0}")]
    PipelinePrecondition(String),

    /// A user-supplied hook returned an error
    #[error("Hook error: {0}")]
    Hook(#[source] HookError),

    /// Structural validation of the output document failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// OpenAPI document error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new schema compilation error
    pub fn compile<S: Into<String>>(msg: S) -> Self {
        Self::SchemaCompilation(msg.into())
    }

    /// Create a new pipeline precondition error
    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::PipelinePrecondition(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap an error returned by a user-supplied hook
    pub fn hook<E: Into<HookError>>(err: E) -> Self {
        Self::Hook(err.into())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Config(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Config(s)
    }
}
