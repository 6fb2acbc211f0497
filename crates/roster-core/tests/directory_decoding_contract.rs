//! Contract: directory decoding and stale-over-corrupt retention
//!
//! Verifies the fetch/decode posture:
//! - Encrypted entries decode transparently; after a cycle every held entry
//!   has a validated dotted-quad address
//! - A single undecodable entry discards the WHOLE fetched set and keeps
//!   the previous directory (all-or-nothing replacement)
//! - A degraded registry keeps the previous directory too
//!
//! If these fail, the engine can expose corrupted or empty peer data.

mod common;

use common::*;
use roster_core::traits::DirectoryEntry;
use roster_core::{AddressCipher, EngineSeed, Error, ReconcileEngine};

#[tokio::test]
async fn mixed_directory_is_fully_decoded() {
    let cipher = AddressCipher::generate();
    let key = cipher.key_b64().to_string();
    let bob_sealed = cipher.encrypt_str("198.51.100.9").unwrap();

    let resolver = ScriptedResolver::always("203.0.113.5");
    let registry = MockRegistry::returning(vec![
        DirectoryEntry::new("alice", "203.0.113.5"),
        DirectoryEntry::new("bob", bob_sealed),
    ]);

    let (mut engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(registry.clone()),
        Some(cipher),
        &encrypted_config(&key),
        None,
    )
    .expect("engine construction succeeds");

    let outcome = engine.update().await;

    assert!(outcome.refreshed);
    assert_eq!(
        engine.directory(),
        &[
            DirectoryEntry::new("alice", "203.0.113.5"),
            DirectoryEntry::new("bob", "198.51.100.9"),
        ],
        "order preserved, ciphertext replaced with the decoded address"
    );

    // Published fields went out sealed, and open back to the plaintext
    let published = registry.published();
    assert_eq!(published.len(), 1);
    let (wire_label, wire_address) = &published[0];
    assert_ne!(wire_label, "test-machine");
    assert_ne!(wire_address, "203.0.113.5");

    let reloaded = AddressCipher::from_key_b64(&key).unwrap();
    assert_eq!(reloaded.decrypt_str(wire_label).unwrap(), "test-machine");
    assert_eq!(reloaded.decrypt_str(wire_address).unwrap(), "203.0.113.5");
}

#[tokio::test]
async fn undecodable_entry_keeps_previous_directory() {
    let cipher = AddressCipher::generate();
    let key = cipher.key_b64().to_string();

    let previous = vec![DirectoryEntry::new("alice", "203.0.113.5")];
    let seed = EngineSeed {
        last_known_address: None,
        directory: previous.clone(),
    };

    let resolver = ScriptedResolver::always("203.0.113.5");
    let registry = MockRegistry::returning(vec![
        DirectoryEntry::new("alice", "203.0.113.5"),
        DirectoryEntry::new("mallory", "not-a-quad-and-not-a-token"),
    ]);

    let (mut engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(registry),
        Some(cipher),
        &encrypted_config(&key),
        Some(seed),
    )
    .expect("engine construction succeeds");

    let outcome = engine.update().await;

    assert!(!outcome.refreshed);
    assert!(matches!(outcome.failure, Some(Error::DirectoryDecoding(_))));
    assert_eq!(
        engine.directory(),
        previous.as_slice(),
        "the whole fetched set is discarded, not just the bad entry"
    );
}

#[tokio::test]
async fn wrong_key_ciphertext_is_a_decoding_failure() {
    let publisher_cipher = AddressCipher::generate();
    let sealed_elsewhere = publisher_cipher.encrypt_str("198.51.100.9").unwrap();

    // This engine holds a different key
    let local_cipher = AddressCipher::generate();
    let key = local_cipher.key_b64().to_string();

    let resolver = ScriptedResolver::always("203.0.113.5");
    let registry = MockRegistry::returning(vec![DirectoryEntry::new("bob", sealed_elsewhere)]);

    let (mut engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(registry),
        Some(local_cipher),
        &encrypted_config(&key),
        None,
    )
    .expect("engine construction succeeds");

    let outcome = engine.update().await;

    assert!(matches!(outcome.failure, Some(Error::DirectoryDecoding(_))));
    assert!(engine.directory().is_empty(), "nothing partial was admitted");
}

#[tokio::test]
async fn ciphertext_without_a_key_is_a_decoding_failure() {
    let resolver = ScriptedResolver::always("203.0.113.5");
    let registry = MockRegistry::returning(vec![DirectoryEntry::new("bob", "opaque-token")]);

    let (mut engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(registry),
        None,
        &test_config(),
        None,
    )
    .expect("engine construction succeeds");

    let outcome = engine.update().await;

    assert!(matches!(outcome.failure, Some(Error::DirectoryDecoding(_))));
}

#[tokio::test]
async fn unavailable_registry_keeps_previous_directory() {
    let previous = vec![
        DirectoryEntry::new("alice", "203.0.113.5"),
        DirectoryEntry::new("bob", "198.51.100.9"),
    ];
    let seed = EngineSeed {
        last_known_address: Some("203.0.113.7".to_string()),
        directory: previous.clone(),
    };

    let resolver = ScriptedResolver::always("203.0.113.7");
    let registry = MockRegistry::unavailable();

    let (mut engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(registry.clone()),
        None,
        &test_config(),
        Some(seed),
    )
    .expect("engine construction succeeds");

    let outcome = engine.update().await;

    assert!(matches!(outcome.failure, Some(Error::RegistryUnavailable)));
    assert_eq!(engine.directory(), previous.as_slice());
    assert!(engine.last_refreshed().is_none());

    // Once the backend recovers, the next cycle replaces the directory.
    registry.set_fetch(FetchScript::Entries(vec![DirectoryEntry::new(
        "carol",
        "192.0.2.44",
    )]));
    let outcome = engine.update().await;

    assert!(outcome.refreshed);
    assert_eq!(
        engine.directory(),
        &[DirectoryEntry::new("carol", "192.0.2.44")]
    );
    assert!(engine.last_refreshed().is_some());
}

#[tokio::test]
async fn malformed_payload_keeps_previous_directory() {
    let previous = vec![DirectoryEntry::new("alice", "203.0.113.5")];
    let seed = EngineSeed {
        last_known_address: None,
        directory: previous.clone(),
    };

    let resolver = ScriptedResolver::failing("offline");
    let registry = MockRegistry::returning(vec![]);
    registry.set_fetch(FetchScript::Malformed);

    let (mut engine, _events) = ReconcileEngine::new(
        Box::new(resolver),
        Box::new(registry),
        None,
        &test_config(),
        Some(seed),
    )
    .expect("engine construction succeeds");

    let outcome = engine.update().await;

    assert!(matches!(outcome.failure, Some(Error::MalformedResponse(_))));
    assert_eq!(engine.directory(), previous.as_slice());
}
