// # Address Resolver Trait
//
// Defines the interface for resolving this machine's current public address
// through an external lookup service.
//
// ## Implementations
//
// - HTTP-based: `roster-ip-http` crate (api.ipify.org and friends)
//
// ## Responsibility boundary
//
// Resolvers are single-shot observers. A resolver performs ONE outbound
// lookup per call and reports the raw candidate string; it does not retry,
// does not validate the candidate shape (the engine owns validation), and
// does not decide what to do with the result. Retry policy belongs to the
// scheduler that triggers reconciliation cycles, not to this component.

use async_trait::async_trait;

use crate::error::Result;

/// Trait for own-address resolver implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Look up the machine's current public address.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The candidate address as reported by the lookup
    ///   service (not yet validated)
    /// - `Err(Error::Resolution)`: Any transport-level failure — timeout,
    ///   DNS failure, connection refused, non-2xx status
    async fn resolve(&self) -> Result<String>;

    /// Get the resolver name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing resolvers from configuration
pub trait AddressResolverFactory: Send + Sync {
    /// Create an AddressResolver instance from configuration
    fn create(&self, config: &crate::config::ResolverConfig) -> Result<Box<dyn AddressResolver>>;
}
