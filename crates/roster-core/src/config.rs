//! Configuration types for the roster agent
//!
//! This module defines all configuration structures used throughout the
//! crate. Configuration is owned externally and read-only to the core; it is
//! validated once at engine construction rather than trusted at point of use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main roster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Registry client configuration
    pub registry: RegistryConfig,

    /// Own-address resolver configuration
    pub resolver: ResolverConfig,

    /// Label this machine publishes under
    pub machine_label: String,

    /// Seconds between scheduler-triggered reconciliation cycles
    pub update_interval_secs: u64,

    /// Wire-field encryption settings
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RosterConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.machine_label.is_empty() {
            return Err(crate::Error::config("Machine label cannot be empty"));
        }
        if self.update_interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0"));
        }

        self.registry.validate()?;
        self.resolver.validate()?;
        self.encryption.validate()?;

        Ok(())
    }
}

/// Own-address resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolverConfig {
    /// HTTP-based lookup against an external "what is my address" service
    Http {
        /// URL to fetch the address from
        url: String,
    },

    /// Custom resolver
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ResolverConfig::Http { url } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Resolver URL cannot be empty"));
                }
                Ok(())
            }
            ResolverConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom resolver factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom resolver config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the resolver type name
    pub fn type_name(&self) -> &str {
        match self {
            ResolverConfig::Http { .. } => "http",
            ResolverConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryConfig {
    /// HTTP/JSON registry reached at a single endpoint URL
    Http {
        /// Registry endpoint URL
        url: String,
        /// Shared auth token carried in every request body
        auth_code: String,
    },

    /// Custom registry client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl RegistryConfig {
    /// Validate the registry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RegistryConfig::Http { url, auth_code } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Registry URL cannot be empty"));
                }
                if auth_code.is_empty() {
                    return Err(crate::Error::config("Registry auth code cannot be empty"));
                }
                Ok(())
            }
            RegistryConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom registry factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom registry config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the registry type name
    pub fn type_name(&self) -> &str {
        match self {
            RegistryConfig::Http { .. } => "http",
            RegistryConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Wire-field encryption configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Whether labels and addresses are encrypted before publishing
    #[serde(default)]
    pub enabled: bool,

    /// Standard-base64 encoded 32-byte key. Absent triggers key generation
    /// at startup; the generated key must be written back by the external
    /// configuration collaborator.
    #[serde(default)]
    pub key_b64: Option<String>,
}

impl EncryptionConfig {
    /// Validate the encryption configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(ref key) = self.key_b64 {
            // Well-formedness only; the cipher is constructed by the caller.
            crate::cipher::AddressCipher::from_key_b64(key)?;
        }
        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log) rather than
    /// blocking a reconciliation cycle on a slow consumer.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Additional metadata to attach to operations
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            metadata: HashMap::new(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    256
}
