//! Test doubles and common utilities for engine contract tests
//!
//! These doubles script the two network seams (own-address lookup, registry)
//! and count calls, so the contract tests can pin the engine's failure
//! posture without any real I/O.

use roster_core::config::{EncryptionConfig, EngineConfig, RegistryConfig, ResolverConfig, RosterConfig};
use roster_core::error::{Error, Result};
use roster_core::traits::{AddressResolver, DirectoryEntry, RegistryClient};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A resolver that replays scripted responses, then repeats a fallback.
///
/// Clones share state, so tests can keep a handle while the engine owns a
/// boxed clone.
#[derive(Clone)]
pub struct ScriptedResolver {
    responses: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    fallback: std::result::Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    /// Always resolve to the same candidate
    pub fn always(address: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Ok(address.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fail at the transport level
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Err(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue one response ahead of the fallback
    pub fn then_ok(self, address: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(address.to_string()));
        self
    }

    /// Number of times resolve() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(Error::resolution)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// What the mock registry answers to fetch_directory
pub enum FetchScript {
    Entries(Vec<DirectoryEntry>),
    Unavailable,
    Malformed,
}

/// A registry client double that records publishes and scripts fetches.
///
/// Clones share counters and recordings.
#[derive(Clone)]
pub struct MockRegistry {
    publish_calls: Arc<AtomicUsize>,
    published: Arc<Mutex<Vec<(String, String)>>>,
    publish_fails: Arc<AtomicBool>,
    fetch_calls: Arc<AtomicUsize>,
    fetch_last_known: Arc<Mutex<Vec<Option<String>>>>,
    fetch_script: Arc<Mutex<FetchScript>>,
}

impl MockRegistry {
    /// Registry whose fetch returns the given rows
    pub fn returning(entries: Vec<DirectoryEntry>) -> Self {
        Self::with_script(FetchScript::Entries(entries))
    }

    /// Registry whose backing store is down
    pub fn unavailable() -> Self {
        Self::with_script(FetchScript::Unavailable)
    }

    fn with_script(script: FetchScript) -> Self {
        Self {
            publish_calls: Arc::new(AtomicUsize::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
            publish_fails: Arc::new(AtomicBool::new(false)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            fetch_last_known: Arc::new(Mutex::new(Vec::new())),
            fetch_script: Arc::new(Mutex::new(script)),
        }
    }

    /// Make every publish attempt fail
    pub fn with_failing_publish(self) -> Self {
        self.publish_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Replace the fetch script for subsequent cycles
    pub fn set_fetch(&self, script: FetchScript) {
        *self.fetch_script.lock().unwrap() = script;
    }

    /// Number of times publish_address() was called
    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Recorded (label, address) pairs from publish attempts
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    /// Number of times fetch_directory() was called
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// The `last_known` argument of every fetch call, in order
    pub fn fetch_last_known(&self) -> Vec<Option<String>> {
        self.fetch_last_known.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RegistryClient for MockRegistry {
    async fn publish_address(&self, label: &str, address: &str) -> Result<()> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.published
            .lock()
            .unwrap()
            .push((label.to_string(), address.to_string()));

        if self.publish_fails.load(Ordering::SeqCst) {
            return Err(Error::RegistryUnavailable);
        }
        Ok(())
    }

    async fn fetch_directory(
        &self,
        _label: &str,
        last_known: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_last_known
            .lock()
            .unwrap()
            .push(last_known.map(str::to_string));

        match &*self.fetch_script.lock().unwrap() {
            FetchScript::Entries(entries) => Ok(entries.clone()),
            FetchScript::Unavailable => Err(Error::RegistryUnavailable),
            FetchScript::Malformed => Err(Error::malformed_response("scripted malformed payload")),
        }
    }

    fn registry_name(&self) -> &'static str {
        "mock"
    }
}

/// Minimal configuration with encryption disabled
pub fn test_config() -> RosterConfig {
    RosterConfig {
        registry: RegistryConfig::Http {
            url: "https://registry.example/exec".to_string(),
            auth_code: "test-token".to_string(),
        },
        resolver: ResolverConfig::Http {
            url: "https://lookup.example".to_string(),
        },
        machine_label: "test-machine".to_string(),
        update_interval_secs: 60,
        encryption: EncryptionConfig::default(),
        engine: EngineConfig::default(),
    }
}

/// Minimal configuration with encryption enabled under the given key
pub fn encrypted_config(key_b64: &str) -> RosterConfig {
    let mut config = test_config();
    config.encryption = EncryptionConfig {
        enabled: true,
        key_b64: Some(key_b64.to_string()),
    };
    config
}
