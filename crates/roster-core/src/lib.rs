// # roster-core
//
// Core library for the roster address-reconciliation agent.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping a remote machine
// directory in sync with this machine's public address:
// - **AddressResolver**: Trait for looking up the machine's current public address
// - **RegistryClient**: Trait for publishing the address and fetching the peer directory
// - **AddressCipher**: Symmetric AEAD adapter for field-level encryption of wire values
// - **ReconcileEngine**: Core engine that runs the resolve → publish → fetch → decode cycle
// - **ComponentRegistry**: Plugin-based registry for resolvers and registry clients
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from transport implementations
// 2. **Trigger-Driven**: Each reconciliation cycle is one explicit `update()` call
// 3. **Plugin-Based**: Resolvers and registry clients are registered dynamically
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Stale over Corrupt**: Fetch and decode failures never tear down the last good directory

pub mod cipher;
pub mod config;
pub mod engine;
pub mod error;
pub mod ipv4;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use cipher::AddressCipher;
pub use config::{EncryptionConfig, RegistryConfig, ResolverConfig, RosterConfig};
pub use engine::{CycleOutcome, EngineEvent, EngineSeed, ReconcileEngine};
pub use error::{Error, Result};
pub use ipv4::is_valid_ipv4;
pub use registry::ComponentRegistry;
pub use traits::{AddressResolver, DirectoryEntry, RegistryClient};
