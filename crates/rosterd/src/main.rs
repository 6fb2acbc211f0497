// # rosterd - Roster Daemon
//
// Thin integration layer around roster-core:
// 1. Read configuration from environment variables
// 2. Initialize the runtime and tracing
// 3. Register resolvers and registry clients
// 4. Run reconciliation cycles on a fixed interval until a signal arrives
//
// All reconciliation logic lives in roster-core; this binary only wires
// components together and owns the single scheduler loop that serializes
// `update()` calls.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `ROSTER_REGISTRY_URL`: registry endpoint URL (required)
// - `ROSTER_AUTH_CODE`: shared registry token (required)
// - `ROSTER_MACHINE_LABEL`: label this machine publishes under (required)
// - `ROSTER_IP_SERVICE_URL`: own-address lookup service
//   (default: https://api.ipify.org)
// - `ROSTER_UPDATE_INTERVAL_SECS`: seconds between cycles (default: 300)
// - `ROSTER_ENCRYPTION`: "true" to encrypt published fields (default: false)
// - `ROSTER_ENCRYPTION_KEY`: base64 32-byte key; when encryption is enabled
//   and this is unset, a fresh key is generated and logged for persistence
// - `ROSTER_LOG_LEVEL`: trace|debug|info|warn|error (default: info)
//
// ## Example
//
// ```bash
// export ROSTER_REGISTRY_URL=https://script.example.com/macros/s/.../exec
// export ROSTER_AUTH_CODE=shared-secret
// export ROSTER_MACHINE_LABEL=home-server
// export ROSTER_ENCRYPTION=true
//
// rosterd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use roster_core::config::{
    EncryptionConfig, EngineConfig, RegistryConfig, ResolverConfig, RosterConfig,
};
use roster_core::{AddressCipher, ComponentRegistry, ReconcileEngine};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RosterExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RosterExitCode> for ExitCode {
    fn from(code: RosterExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    registry_url: String,
    auth_code: String,
    machine_label: String,
    ip_service_url: String,
    update_interval_secs: u64,
    encryption_enabled: bool,
    encryption_key: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            registry_url: env::var("ROSTER_REGISTRY_URL")
                .map_err(|_| anyhow::anyhow!("ROSTER_REGISTRY_URL is required"))?,
            auth_code: env::var("ROSTER_AUTH_CODE")
                .map_err(|_| anyhow::anyhow!("ROSTER_AUTH_CODE is required"))?,
            machine_label: env::var("ROSTER_MACHINE_LABEL")
                .map_err(|_| anyhow::anyhow!("ROSTER_MACHINE_LABEL is required"))?,
            ip_service_url: env::var("ROSTER_IP_SERVICE_URL")
                .unwrap_or_else(|_| "https://api.ipify.org".to_string()),
            update_interval_secs: env::var("ROSTER_UPDATE_INTERVAL_SECS")
                .ok()
                .map(|s| s.parse().unwrap_or(300))
                .unwrap_or(300),
            encryption_enabled: env::var("ROSTER_ENCRYPTION")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            encryption_key: env::var("ROSTER_ENCRYPTION_KEY").ok(),
            log_level: env::var("ROSTER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration beyond what roster-core checks
    fn validate(&self) -> Result<()> {
        if !self.registry_url.starts_with("https://") && !self.registry_url.starts_with("http://") {
            anyhow::bail!(
                "ROSTER_REGISTRY_URL must use HTTP or HTTPS scheme. Got: {}",
                self.registry_url
            );
        }

        if !self.ip_service_url.starts_with("https://")
            && !self.ip_service_url.starts_with("http://")
        {
            anyhow::bail!(
                "ROSTER_IP_SERVICE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.ip_service_url
            );
        }

        if !(10..=86400).contains(&self.update_interval_secs) {
            anyhow::bail!(
                "ROSTER_UPDATE_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                self.update_interval_secs
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.auth_code.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("example")
        {
            anyhow::bail!(
                "ROSTER_AUTH_CODE appears to be a placeholder. \
                Use the actual shared token configured on the registry."
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ROSTER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the core configuration
    fn to_roster_config(&self) -> RosterConfig {
        RosterConfig {
            registry: RegistryConfig::Http {
                url: self.registry_url.clone(),
                auth_code: self.auth_code.clone(),
            },
            resolver: ResolverConfig::Http {
                url: self.ip_service_url.clone(),
            },
            machine_label: self.machine_label.clone(),
            update_interval_secs: self.update_interval_secs,
            encryption: EncryptionConfig {
                enabled: self.encryption_enabled,
                key_b64: self.encryption_key.clone(),
            },
            engine: EngineConfig::default(),
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RosterExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return RosterExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RosterExitCode::ConfigError.into();
    }

    info!("Starting rosterd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RosterExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            RosterExitCode::RuntimeError
        } else {
            RosterExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    // Create component registry and register built-in implementations
    let components = ComponentRegistry::new();
    roster_ip_http::register(&components);
    roster_registry_http::register(&components);

    let roster_config = config.to_roster_config();

    // Build the cipher when encryption is enabled. A generated key must be
    // surfaced to the operator, or every published entry becomes
    // undecodable after restart.
    let cipher = if config.encryption_enabled {
        match &config.encryption_key {
            Some(key) => Some(AddressCipher::from_key_b64(key)?),
            None => {
                let cipher = AddressCipher::generate();
                warn!(
                    "No encryption key configured; generated a fresh one. \
                    Persist it now: ROSTER_ENCRYPTION_KEY={}",
                    cipher.key_b64()
                );
                Some(cipher)
            }
        }
    } else {
        None
    };

    let resolver = components.create_resolver(&roster_config.resolver)?;
    let registry = components.create_registry_client(&roster_config.registry)?;

    let (mut engine, mut event_rx) =
        ReconcileEngine::new(resolver, registry, cipher, &roster_config, None)?;

    // Drain engine events into the log at debug level. The UI collaborator
    // would consume this channel instead.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "engine event");
        }
    });

    info!(
        label = %config.machine_label,
        interval_secs = config.update_interval_secs,
        encryption = config.encryption_enabled,
        "reconciliation loop starting"
    );

    // Single scheduler loop: one cycle per tick, one engine owner. This is
    // the serialization point for `update()` — there is no other caller.
    let mut interval = tokio::time::interval(Duration::from_secs(config.update_interval_secs));

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let name = wait_for_shutdown().await;
        let _ = shutdown_tx.send(name);
    });

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = engine.update().await;
                if let Some(failure) = &outcome.failure {
                    warn!(
                        directory_entries = engine.directory().len(),
                        "cycle completed with directory failure: {}", failure
                    );
                } else {
                    info!(
                        published = outcome.published,
                        directory_entries = engine.directory().len(),
                        "cycle completed"
                    );
                }
            }

            signal_name = &mut shutdown_rx => {
                match signal_name {
                    Ok(Ok(name)) => info!("Received shutdown signal: {}", name),
                    Ok(Err(e)) => error!("Signal handler error: {}", e),
                    Err(_) => error!("Signal task dropped unexpectedly"),
                }
                break;
            }
        }
    }

    info!(
        last_address = engine.current_address().unwrap_or("<none>"),
        "Shutting down daemon"
    );

    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
