// # Registry Client Trait
//
// Defines the interface for talking to the remote machine directory: one
// operation to publish this machine's address, one to fetch the full peer
// directory.
//
// ## Implementations
//
// - HTTP/JSON against a spreadsheet-backed web app: `roster-registry-http`
//
// ## Responsibility boundary
//
// Registry clients transmit opaque strings. Whether a label or address is
// plaintext or ciphertext is decided by the engine before the call; the
// client knows nothing about encryption. Clients are stateless and
// single-shot: no retry, no caching, no decisions about whether a publish
// is needed — all of that is owned by the engine and its scheduler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One label → address mapping in the peer directory.
///
/// The address is either a plaintext dotted quad or an opaque ciphertext
/// envelope; after a reconciliation cycle completes, every entry held by the
/// engine has a validated dotted-quad address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Machine label as stored by the registry
    pub label: String,
    /// Address as stored by the registry
    pub address: String,
}

impl DirectoryEntry {
    /// Create a new directory entry
    pub fn new(label: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
        }
    }
}

/// Trait for registry client implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Publish an address for a machine label.
    ///
    /// `label` and `address` are wire-ready opaque strings (pre-encrypted by
    /// the caller when encryption is enabled).
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The registry accepted the publish
    /// - `Err(Error::InvalidEndpoint)`: Configured URL is unusable; no
    ///   network call was made
    /// - `Err(Error::RegistryUnavailable)`: The registry's backing store is
    ///   down (HTML error page detected)
    /// - `Err(Error::Http)`: Transport failure
    async fn publish_address(&self, label: &str, address: &str) -> Result<()>;

    /// Fetch the full peer directory.
    ///
    /// `last_known` is this machine's last successfully published address,
    /// absent on a cold start.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DirectoryEntry>)`: The directory rows in registry order,
    ///   addresses still in wire form
    /// - `Err(Error::MalformedResponse)`: Payload shape was unexpected
    /// - plus the same endpoint/availability/transport errors as publish
    async fn fetch_directory(
        &self,
        label: &str,
        last_known: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>>;

    /// Get the registry client name (for logging/debugging)
    fn registry_name(&self) -> &'static str;
}

/// Helper trait for constructing registry clients from configuration
pub trait RegistryClientFactory: Send + Sync {
    /// Create a RegistryClient instance from configuration
    fn create(&self, config: &crate::config::RegistryConfig) -> Result<Box<dyn RegistryClient>>;
}
