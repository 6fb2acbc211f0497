//! Plugin-based component registry
//!
//! The registry allows address resolvers and registry clients to be
//! registered dynamically at runtime, avoiding hardcoded if-else chains in
//! the daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roster_core::ComponentRegistry;
//! use roster_core::config::{RegistryConfig, ResolverConfig};
//!
//! let registry = ComponentRegistry::new();
//!
//! // Implementations register themselves during initialization
//! roster_ip_http::register(&registry);
//! roster_registry_http::register(&registry);
//!
//! // Create components from config
//! let resolver = registry.create_resolver(&resolver_config)?;
//! let client = registry.create_registry_client(&registry_config)?;
//! ```

use crate::config::{RegistryConfig, ResolverConfig};
use crate::error::{Error, Result};
use crate::traits::{AddressResolver, AddressResolverFactory, RegistryClient, RegistryClientFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Component registry for plugin-based construction
///
/// The registry maintains maps of type names to factory objects, allowing
/// dynamic instantiation of resolvers and registry clients based on
/// configuration.
///
/// ## Thread Safety
///
/// Uses interior mutability with RwLock, allowing concurrent reads and
/// exclusive writes.
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered address resolver factories
    resolvers: RwLock<HashMap<String, Box<dyn AddressResolverFactory>>>,

    /// Registered registry client factories
    registry_clients: RwLock<HashMap<String, Box<dyn RegistryClientFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address resolver factory
    pub fn register_resolver(
        &self,
        name: impl Into<String>,
        factory: Box<dyn AddressResolverFactory>,
    ) {
        let mut resolvers = self.resolvers.write().unwrap();
        resolvers.insert(name.into(), factory);
    }

    /// Register a registry client factory
    pub fn register_registry_client(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RegistryClientFactory>,
    ) {
        let mut clients = self.registry_clients.write().unwrap();
        clients.insert(name.into(), factory);
    }

    /// Create an address resolver from configuration
    pub fn create_resolver(&self, config: &ResolverConfig) -> Result<Box<dyn AddressResolver>> {
        let resolver_type = config.type_name();
        let resolvers = self.resolvers.read().unwrap();

        let factory = resolvers
            .get(resolver_type)
            .ok_or_else(|| Error::config(format!("Unknown resolver type: {}", resolver_type)))?;

        factory.create(config)
    }

    /// Create a registry client from configuration
    pub fn create_registry_client(&self, config: &RegistryConfig) -> Result<Box<dyn RegistryClient>> {
        let registry_type = config.type_name();
        let clients = self.registry_clients.read().unwrap();

        let factory = clients
            .get(registry_type)
            .ok_or_else(|| Error::config(format!("Unknown registry type: {}", registry_type)))?;

        factory.create(config)
    }

    /// List all registered resolver types
    pub fn list_resolvers(&self) -> Vec<String> {
        let resolvers = self.resolvers.read().unwrap();
        resolvers.keys().cloned().collect()
    }

    /// List all registered registry client types
    pub fn list_registry_clients(&self) -> Vec<String> {
        let clients = self.registry_clients.read().unwrap();
        clients.keys().cloned().collect()
    }

    /// Check if a resolver type is registered
    pub fn has_resolver(&self, name: &str) -> bool {
        let resolvers = self.resolvers.read().unwrap();
        resolvers.contains_key(name)
    }

    /// Check if a registry client type is registered
    pub fn has_registry_client(&self, name: &str) -> bool {
        let clients = self.registry_clients.read().unwrap();
        clients.contains_key(name)
    }
}
