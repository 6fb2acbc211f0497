// # HTTP Own-Address Resolver
//
// This crate resolves the machine's externally visible address by asking an
// HTTP lookup service (e.g. api.ipify.org) and returning the response body.
//
// ## Architecture
//
// One GET per `resolve()` call, no retry, no caching: the resolver is a
// single-shot observer and retry policy lives with the scheduler that
// triggers reconciliation cycles. Transport failures and non-2xx statuses
// all surface as `Error::Resolution` for the engine to absorb.

use roster_core::ComponentRegistry;
use roster_core::config::ResolverConfig;
use roster_core::traits::{AddressResolver, AddressResolverFactory};
use roster_core::{Error, Result};

use std::time::Duration;

/// Default request timeout for the lookup service
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Well-known lookup services (for future failover support)
#[allow(dead_code)]
const DEFAULT_LOOKUP_SERVICES: &[&str] = &[
    "https://api.ipify.org",  // returns plain text IP
    "https://ifconfig.me/ip", // no rate limit documented
    "https://icanhazip.com",  // no rate limit documented
];

/// HTTP-based own-address resolver
pub struct HttpAddressResolver {
    /// URL of the lookup service
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a new HTTP address resolver
    ///
    /// # Parameters
    ///
    /// - `url`: lookup service URL whose response body is the address
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("lookup request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "lookup service returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("failed to read lookup response: {}", e)))?;

        // Lookup services commonly append a trailing newline. The validator
        // downstream is whitespace-strict, so the transport strips it here.
        Ok(body.trim().to_string())
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP address resolvers
pub struct HttpResolverFactory;

impl AddressResolverFactory for HttpResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn AddressResolver>> {
        match config {
            ResolverConfig::Http { url } => Ok(Box::new(HttpAddressResolver::new(url.clone()))),
            _ => Err(Error::config("Invalid config for HTTP address resolver")),
        }
    }
}

/// Register the HTTP resolver with a component registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_resolver("http", Box::new(HttpResolverFactory));
}
