// # HTTP Registry Client
//
// This crate talks to the remote machine directory: a single web-app
// endpoint backed by a spreadsheet store, answering JSON to POSTed JSON.
//
// ## Protocol
//
// Both operations POST to the one configured URL with
// `Content-Type: application/json` and an `authCode` field carrying the
// shared token:
//
// ```http
// POST <endpoint>
// {"authCode": "...", "serviceName": "<label>", "requestType": "UPDATE_IP", "ip": "<address>"}
//
// POST <endpoint>
// {"authCode": "...", "serviceName": "<label>", "requestType": "REQUEST_NETWORK", "ip": "<last known or null>"}
// ```
//
// The fetch response is `{"status": ..., "message": ..., "value": [[label, address], ...]}`;
// only `value` is interpreted.
//
// ## Degradation signal
//
// The hosting platform answers HTTP 200 even when the backing store is
// unreachable — the reliable signal is that the body is an HTML error page
// instead of JSON. The client scans for the literal `<!DOCTYPE html>`
// marker before any parsing.
//
// ## Responsibility boundary
//
// - Labels and addresses pass through as opaque strings (the engine owns
//   encryption).
// - One request per call, full error propagation, no retry: the engine and
//   its scheduler own the failure posture.
// - The auth code NEVER appears in logs or Debug output.

use async_trait::async_trait;
use roster_core::ComponentRegistry;
use roster_core::config::RegistryConfig;
use roster_core::traits::{DirectoryEntry, RegistryClient, RegistryClientFactory};
use roster_core::{Error, Result};

use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout for registry requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Marker the hosting platform serves when the backing store is down
const HTML_SENTINEL: &str = "<!DOCTYPE html>";

/// HTTP registry client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the auth code.
pub struct HttpRegistryClient {
    /// Registry endpoint URL
    endpoint: String,

    /// Shared auth token
    /// ⚠️ NEVER log this value
    auth_code: String,

    /// HTTP client for registry requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the auth code
impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("endpoint", &self.endpoint)
            .field("auth_code", &"<REDACTED>")
            .finish()
    }
}

impl HttpRegistryClient {
    /// Create a new HTTP registry client
    ///
    /// # Parameters
    ///
    /// - `endpoint`: registry endpoint URL (validated before every request)
    /// - `auth_code`: shared token carried in every request body
    pub fn new(endpoint: impl Into<String>, auth_code: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_code: auth_code.into(),
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Check that the endpoint is a usable URL with a scheme and a host.
    ///
    /// Runs before every request so a misconfigured endpoint fails fast
    /// without a network call.
    fn validate_endpoint(&self) -> Result<()> {
        // Url::parse already requires a scheme; a host must be present too.
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|_| Error::invalid_endpoint(self.endpoint.clone()))?;
        if url.host().is_none() {
            return Err(Error::invalid_endpoint(self.endpoint.clone()));
        }
        Ok(())
    }

    /// POST a JSON body to the endpoint and return the response text,
    /// after screening it for the degraded-backend HTML page.
    async fn post(&self, body: serde_json::Value) -> Result<String> {
        self.validate_endpoint()?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::http(format!("registry request failed: {}", e)))?;

        // The hosting platform reports application errors inside its JSON
        // envelope with status 200, so the status line is not checked here.
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("failed to read registry response: {}", e)))?;

        if is_backend_error_page(&text) {
            return Err(Error::RegistryUnavailable);
        }

        Ok(text)
    }
}

/// Whether a response body is the hosting platform's HTML error page
fn is_backend_error_page(body: &str) -> bool {
    body.contains(HTML_SENTINEL)
}

/// Parse a fetch response body into directory entries.
///
/// Expects a top-level `value` field holding an array of `[label, address]`
/// pairs; anything else is a malformed response.
fn parse_directory(body: &str) -> Result<Vec<DirectoryEntry>> {
    #[derive(Deserialize)]
    struct Envelope {
        value: Vec<(String, String)>,
    }

    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| Error::malformed_response(format!("unexpected registry payload: {}", e)))?;

    Ok(envelope
        .value
        .into_iter()
        .map(|(label, address)| DirectoryEntry::new(label, address))
        .collect())
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn publish_address(&self, label: &str, address: &str) -> Result<()> {
        tracing::debug!("publishing address to registry");

        let body = serde_json::json!({
            "authCode": self.auth_code,
            "serviceName": label,
            "requestType": "UPDATE_IP",
            "ip": address,
        });

        // The ack body carries no structured payload worth interpreting;
        // reaching this point without a sentinel hit is success.
        let _ = self.post(body).await?;
        Ok(())
    }

    async fn fetch_directory(
        &self,
        label: &str,
        last_known: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>> {
        tracing::debug!("fetching peer directory from registry");

        let body = serde_json::json!({
            "authCode": self.auth_code,
            "serviceName": label,
            "requestType": "REQUEST_NETWORK",
            "ip": last_known, // null on cold start
        });

        let text = self.post(body).await?;
        parse_directory(&text)
    }

    fn registry_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP registry clients
pub struct HttpRegistryFactory;

impl RegistryClientFactory for HttpRegistryFactory {
    fn create(&self, config: &RegistryConfig) -> Result<Box<dyn RegistryClient>> {
        match config {
            RegistryConfig::Http { url, auth_code } => {
                if auth_code.is_empty() {
                    return Err(Error::config("Registry auth code is required"));
                }
                Ok(Box::new(HttpRegistryClient::new(
                    url.clone(),
                    auth_code.clone(),
                )))
            }
            _ => Err(Error::config("Invalid config for HTTP registry client")),
        }
    }
}

/// Register the HTTP registry client with a component registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_registry_client("http", Box::new(HttpRegistryFactory));
}
