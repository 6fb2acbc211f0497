//! Core reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Resolving this machine's current public address via AddressResolver
//! - Validating the candidate and publishing it via RegistryClient
//! - Fetching the full peer directory and decoding encrypted entries
//! - Owning reconciliation state (last known address, peer directory)
//!
//! ## Cycle
//!
//! ```text
//! ┌──────────────────┐
//! │ AddressResolver  │── candidate ──┐
//! └──────────────────┘               ▼
//!                           ┌─────────────────┐
//!                           │ ReconcileEngine │── EngineEvent ──▶ collaborator
//!                           └─────────────────┘
//!                              │           │
//!                   publish ───┘           └─── fetch + decode
//!                              ▼           ▼
//!                           ┌─────────────────┐
//!                           │ RegistryClient  │
//!                           └─────────────────┘
//! ```
//!
//! One `update()` call runs resolve → validate → publish → fetch → decode to
//! completion. Resolution and publish failures are absorbed (logged, cycle
//! continues); fetch and decode failures leave the previously known
//! directory untouched — stale peer data is preferred over empty or
//! partially corrupt peer data.
//!
//! ## Ownership and serialization
//!
//! The engine owns its state with no internal synchronization and `update()`
//! takes `&mut self`, so overlapping cycles on one instance are rejected by
//! the compiler. The hosting application runs cycles from a single worker
//! (see the `rosterd` scheduler loop). Reconfiguration constructs a new
//! engine seeded from the old instance's state via [`ReconcileEngine::seed`].

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cipher::AddressCipher;
use crate::config::RosterConfig;
use crate::error::{Error, Result};
use crate::ipv4::is_valid_ipv4;
use crate::traits::{AddressResolver, DirectoryEntry, RegistryClient};

/// Events emitted by the ReconcileEngine for the observing collaborator
/// (UI, scheduler). The engine does not format or store logs beyond these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A reconciliation cycle began
    CycleStarted,

    /// Own address resolved and validated
    AddressResolved {
        address: String,
    },

    /// Own-address resolution failed at the transport level
    ResolutionFailed {
        /// Consecutive failures including this one
        consecutive: u32,
    },

    /// The lookup service answered with something that is not a dotted quad
    InvalidCandidate {
        candidate: String,
        /// Consecutive failures including this one
        consecutive: u32,
    },

    /// Address accepted by the registry
    AddressPublished {
        address: String,
    },

    /// Publish failed; the cycle continued
    PublishFailed {
        error: String,
    },

    /// Peer directory replaced with a freshly decoded set
    DirectoryRefreshed {
        entries: usize,
    },

    /// Fetch or decode failed; the previous directory was retained
    FetchFailed {
        error: String,
    },
}

/// Result of one reconciliation cycle.
///
/// `update()` never panics and never propagates an error as an early
/// return; everything that happened in the cycle is reported here.
#[derive(Debug)]
pub struct CycleOutcome {
    /// The validated candidate address, when resolution succeeded
    pub resolved: Option<String>,

    /// Whether the address was accepted by the registry this cycle
    pub published: bool,

    /// Whether the peer directory was replaced this cycle
    pub refreshed: bool,

    /// The fetch/decode error, when the directory could not be refreshed
    pub failure: Option<Error>,
}

/// State carried from a previous engine instance into a replacement.
///
/// Reconfiguration destroys and recreates the engine; seeding keeps the
/// last known address and directory visible so collaborators never observe
/// a momentarily empty state.
#[derive(Debug, Clone, Default)]
pub struct EngineSeed {
    /// Last successfully published address
    pub last_known_address: Option<String>,
    /// Last successfully decoded peer directory
    pub directory: Vec<DirectoryEntry>,
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new`], optionally seeded
/// 2. Run cycles with [`ReconcileEngine::update`], one at a time
/// 3. On reconfiguration, snapshot with [`ReconcileEngine::seed`] and
///    construct a replacement
pub struct ReconcileEngine {
    /// Own-address resolver
    resolver: Box<dyn AddressResolver>,

    /// Registry client for publish and fetch
    registry: Box<dyn RegistryClient>,

    /// Wire-field cipher; present exactly when encryption is enabled
    cipher: Option<AddressCipher>,

    /// Label this machine publishes under
    machine_label: String,

    /// Last successfully published address (plaintext form)
    last_known_address: Option<String>,

    /// Peer directory, replaced wholesale on every successful fetch
    directory: Vec<DirectoryEntry>,

    /// Consecutive resolution failures, reset on success (diagnostics only)
    resolution_failures: u32,

    /// When the directory was last replaced
    last_refreshed: Option<DateTime<Utc>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new reconciliation engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: own-address resolver implementation
    /// - `registry`: registry client implementation
    /// - `cipher`: wire-field cipher; must be `Some` iff encryption is
    ///   enabled in `config`
    /// - `config`: roster configuration (validated here)
    /// - `seed`: previous instance state, if this replaces an engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// engine events
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        registry: Box<dyn RegistryClient>,
        cipher: Option<AddressCipher>,
        config: &RosterConfig,
        seed: Option<EngineSeed>,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        if config.encryption.enabled && cipher.is_none() {
            return Err(Error::config("encryption enabled but no cipher supplied"));
        }
        if !config.encryption.enabled && cipher.is_some() {
            return Err(Error::config("cipher supplied but encryption disabled"));
        }

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);
        let seed = seed.unwrap_or_default();

        let engine = Self {
            resolver,
            registry,
            cipher,
            machine_label: config.machine_label.clone(),
            last_known_address: seed.last_known_address,
            directory: seed.directory,
            resolution_failures: 0,
            last_refreshed: None,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation cycle.
    ///
    /// Repeated calls against an unchanged remote converge to the same
    /// directory. A valid resolution always publishes — there is no
    /// "address unchanged, skip" short-circuit.
    pub async fn update(&mut self) -> CycleOutcome {
        self.emit(EngineEvent::CycleStarted);

        let mut outcome = CycleOutcome {
            resolved: None,
            published: false,
            refreshed: false,
            failure: None,
        };

        // Resolve and validate. Failure skips publish but never skips the
        // fetch below: peers may have moved even while our own lookup is
        // down.
        let candidate = self.resolve_candidate().await;

        if let Some(address) = &candidate {
            outcome.resolved = Some(address.clone());
            match self.publish(address).await {
                Ok(()) => {
                    info!(
                        address = %address,
                        label = %self.machine_label,
                        "published own address"
                    );
                    self.last_known_address = Some(address.clone());
                    self.emit(EngineEvent::AddressPublished {
                        address: address.clone(),
                    });
                    outcome.published = true;
                }
                Err(e) => {
                    warn!("publish failed, continuing cycle: {}", e);
                    self.emit(EngineEvent::PublishFailed {
                        error: e.to_string(),
                    });
                }
            }
        }

        // Always refresh the directory, cold start included.
        match self.refresh_directory().await {
            Ok(entries) => {
                debug!(entries = entries.len(), "peer directory replaced");
                self.directory = entries;
                self.last_refreshed = Some(Utc::now());
                self.emit(EngineEvent::DirectoryRefreshed {
                    entries: self.directory.len(),
                });
                outcome.refreshed = true;
            }
            Err(e) => {
                warn!(
                    retained = self.directory.len(),
                    "directory refresh failed, keeping previous entries: {}", e
                );
                self.emit(EngineEvent::FetchFailed {
                    error: e.to_string(),
                });
                outcome.failure = Some(e);
            }
        }

        outcome
    }

    /// The last successfully published address
    pub fn current_address(&self) -> Option<&str> {
        self.last_known_address.as_deref()
    }

    /// Read access to the peer directory. Side-effect free.
    pub fn directory(&self) -> &[DirectoryEntry] {
        &self.directory
    }

    /// Consecutive resolution failures since the last success
    pub fn resolution_failures(&self) -> u32 {
        self.resolution_failures
    }

    /// When the directory was last replaced, if ever
    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    /// Whether the directory is older than `max_age` (or was never fetched)
    pub fn is_stale(&self, max_age: chrono::Duration) -> bool {
        match self.last_refreshed {
            Some(at) => Utc::now().signed_duration_since(at) > max_age,
            None => true,
        }
    }

    /// Snapshot state for seeding a replacement engine
    pub fn seed(&self) -> EngineSeed {
        EngineSeed {
            last_known_address: self.last_known_address.clone(),
            directory: self.directory.clone(),
        }
    }

    /// Resolve the own address and validate it, tracking the failure
    /// counter. Returns `None` when there is nothing valid to publish.
    async fn resolve_candidate(&mut self) -> Option<String> {
        match self.resolver.resolve().await {
            Ok(candidate) => {
                if is_valid_ipv4(&candidate) {
                    self.resolution_failures = 0;
                    debug!(address = %candidate, "own address resolved");
                    self.emit(EngineEvent::AddressResolved {
                        address: candidate.clone(),
                    });
                    Some(candidate)
                } else {
                    self.resolution_failures += 1;
                    let err = Error::invalid_address(candidate.clone());
                    warn!(
                        consecutive = self.resolution_failures,
                        "lookup service returned an unusable candidate: {}", err
                    );
                    self.emit(EngineEvent::InvalidCandidate {
                        candidate,
                        consecutive: self.resolution_failures,
                    });
                    None
                }
            }
            Err(e) => {
                self.resolution_failures += 1;
                warn!(
                    consecutive = self.resolution_failures,
                    "own-address resolution failed: {}", e
                );
                self.emit(EngineEvent::ResolutionFailed {
                    consecutive: self.resolution_failures,
                });
                None
            }
        }
    }

    /// Publish a validated address, sealing the wire fields when encryption
    /// is enabled. The registry client only ever sees opaque strings.
    async fn publish(&self, address: &str) -> Result<()> {
        let (wire_label, wire_address) = match &self.cipher {
            Some(cipher) => (
                cipher.encrypt_str(&self.machine_label)?,
                cipher.encrypt_str(address)?,
            ),
            None => (self.machine_label.clone(), address.to_string()),
        };

        self.registry
            .publish_address(&wire_label, &wire_address)
            .await
    }

    /// Fetch the directory and decode it. Any error leaves `self.directory`
    /// untouched at the caller.
    async fn refresh_directory(&self) -> Result<Vec<DirectoryEntry>> {
        let fetched = self
            .registry
            .fetch_directory(&self.machine_label, self.last_known_address.as_deref())
            .await?;

        self.decode_entries(fetched)
    }

    /// Decode a fetched directory: every entry whose address is not a
    /// dotted quad must decrypt to one. All-or-nothing — a single
    /// undecodable entry discards the whole fetched set, because a
    /// partially corrupt directory is worse than a stale one.
    fn decode_entries(&self, fetched: Vec<DirectoryEntry>) -> Result<Vec<DirectoryEntry>> {
        let mut decoded = Vec::with_capacity(fetched.len());

        for mut entry in fetched {
            if !is_valid_ipv4(&entry.address) {
                let cipher = self.cipher.as_ref().ok_or_else(|| {
                    Error::directory_decoding(format!(
                        "entry '{}' is not a dotted quad and no encryption key is configured",
                        entry.label
                    ))
                })?;

                let plain = cipher.decrypt_str(&entry.address).map_err(|_| {
                    Error::directory_decoding(format!(
                        "entry '{}' could not be decrypted",
                        entry.label
                    ))
                })?;

                if !is_valid_ipv4(&plain) {
                    return Err(Error::directory_decoding(format!(
                        "entry '{}' decrypted to an invalid address",
                        entry.label
                    )));
                }

                debug!(label = %entry.label, "decoded encrypted peer address");
                entry.address = plain;
            }
            decoded.push(entry);
        }

        Ok(decoded)
    }

    /// Emit an engine event
    fn emit(&self, event: EngineEvent) {
        // Send event, logging a warning if the channel is full. Dropping is
        // preferable to blocking a cycle on a slow event consumer.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_events_are_comparable() {
        let event = EngineEvent::AddressResolved {
            address: "203.0.113.5".to_string(),
        };
        assert_eq!(event.clone(), event);
    }

    #[test]
    fn seed_defaults_to_empty() {
        let seed = EngineSeed::default();
        assert!(seed.last_known_address.is_none());
        assert!(seed.directory.is_empty());
    }
}
