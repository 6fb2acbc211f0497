//! Error types for the roster agent
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for roster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the roster agent
#[derive(Error, Debug)]
pub enum Error {
    /// Own-address lookup failed (transport error, non-2xx status, DNS failure)
    #[error("address resolution failed: {0}")]
    Resolution(String),

    /// A candidate address is not a dotted quad
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The configured registry endpoint is not a usable URL
    #[error("invalid registry endpoint: {0}")]
    InvalidEndpoint(String),

    /// The registry answered with its HTML error page, meaning its backing
    /// store is unreachable
    #[error("registry unavailable (backing store down)")]
    RegistryUnavailable,

    /// The registry answered with a payload of an unexpected shape
    #[error("malformed registry response: {0}")]
    MalformedResponse(String),

    /// Ciphertext could not be authenticated and decrypted
    #[error("decryption failed")]
    Decryption,

    /// A fetched directory entry could not be resolved to a valid address
    #[error("directory decoding failed: {0}")]
    DirectoryDecoding(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client errors below the registry protocol
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an invalid-address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Create an invalid-endpoint error
    pub fn invalid_endpoint(msg: impl Into<String>) -> Self {
        Self::InvalidEndpoint(msg.into())
    }

    /// Create a malformed-response error
    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a directory-decoding error
    pub fn directory_decoding(msg: impl Into<String>) -> Self {
        Self::DirectoryDecoding(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
