//! End-to-end scenarios through the public API.

use once_cell::sync::Lazy;

use vajra_core::crypto::{KdfParams, TAG_SIZE};
use vajra_core::{
    CoreConfig, Error, FilePackage, Identity, IdentityState, MemoryRelay, Relay, VajraCore,
    WireFormat,
};

static CORE: Lazy<VajraCore> = Lazy::new(|| {
    VajraCore::new(CoreConfig {
        kdf: KdfParams::new(2_000).unwrap(),
        ..CoreConfig::legacy()
    })
    .unwrap()
});

struct World {
    relay: MemoryRelay,
    alice: Identity,
    bob: Identity,
}

async fn world() -> World {
    let relay = MemoryRelay::new();
    let alice = CORE.register(&relay, "alice", "p@ss1").await.unwrap();
    let bob = CORE.register(&relay, "bob", "correct horse").await.unwrap();
    World { relay, alice, bob }
}

#[tokio::test]
async fn alice_registers_and_logs_back_in() {
    let relay = MemoryRelay::new();
    let alice = CORE.register(&relay, "alice", "p@ss1").await.unwrap();
    assert_eq!(alice.state(), IdentityState::Unlocked);

    let backup = relay.fetch_wrapper("alice").await.unwrap().unwrap();
    assert_eq!(&backup, alice.wrapper());

    let restored = CORE.restore(&relay, "alice", "p@ss1").await.unwrap();
    assert_eq!(restored.public_key(), alice.public_key());
    assert_eq!(restored.state(), IdentityState::Unlocked);

    let err = CORE.restore(&relay, "alice", "p@ss2").await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationError));
    assert_eq!(err.to_string(), "Incorrect password or corrupted key");
}

#[tokio::test]
async fn empty_file_round_trip() {
    let w = world().await;
    let id = CORE
        .send_file(&w.relay, &w.alice, "bob", Vec::new(), "empty.txt", "text/plain")
        .await
        .unwrap();

    let record = w.relay.fetch_file(&id).await.unwrap();
    assert_eq!(record.package.file_data.len(), TAG_SIZE);

    let file = CORE.receive_file(&w.relay, &w.bob, &id).await.unwrap();
    assert!(file.data.is_empty());
    assert_eq!(file.file_name, "empty.txt");
    assert_eq!(file.file_type, "text/plain");
}

#[tokio::test]
async fn five_megabyte_file_with_one_corrupted_byte() {
    let w = world().await;
    let data: Vec<u8> = (0..5 * 1024 * 1024).map(|i: usize| (i % 253) as u8).collect();
    let id = CORE
        .send_file(&w.relay, &w.alice, "bob", data.clone(), "big.bin", "application/octet-stream")
        .await
        .unwrap();

    let intact = CORE.receive_file(&w.relay, &w.bob, &id).await.unwrap();
    assert_eq!(intact.data, data);

    w.relay
        .tamper_file(&id, |f| {
            let mid = f.package.file_data.len() / 2;
            f.package.file_data[mid] ^= 0x01;
        })
        .unwrap();
    assert!(matches!(
        CORE.receive_file(&w.relay, &w.bob, &id).await,
        Err(Error::IntegrityError)
    ));
}

#[tokio::test]
async fn package_for_bob_is_useless_to_alice() {
    let w = world().await;
    let id = CORE
        .send_file(&w.relay, &w.alice, "bob", b"only bob".to_vec(), "b.txt", "")
        .await
        .unwrap();
    let err = CORE.receive_file(&w.relay, &w.alice, &id).await.unwrap_err();
    assert!(matches!(err, Error::UnsealError | Error::IntegrityError));
}

#[tokio::test]
async fn tampered_iv_and_envelope_are_detected() {
    let w = world().await;
    let id = CORE
        .send_file(&w.relay, &w.alice, "bob", b"payload".to_vec(), "p", "")
        .await
        .unwrap();

    w.relay.tamper_file(&id, |f| f.package.iv.0[0] ^= 0xFF).unwrap();
    assert!(matches!(
        CORE.receive_file(&w.relay, &w.bob, &id).await,
        Err(Error::IntegrityError)
    ));

    w.relay
        .tamper_file(&id, |f| {
            f.package.iv.0[0] ^= 0xFF;
            f.package.encrypted_key[0] ^= 0x01;
        })
        .unwrap();
    assert!(matches!(
        CORE.receive_file(&w.relay, &w.bob, &id).await,
        Err(Error::UnsealError)
    ));
}

#[tokio::test]
async fn repeated_sends_use_fresh_material() {
    let w = world().await;
    let mut ivs = Vec::new();
    let mut envelopes = Vec::new();
    for _ in 0..5 {
        let id = CORE
            .send_file(&w.relay, &w.alice, "bob", b"same".to_vec(), "s", "")
            .await
            .unwrap();
        let record = w.relay.fetch_file(&id).await.unwrap();
        ivs.push(record.package.iv);
        envelopes.push(record.package.encrypted_key);
    }
    for i in 0..ivs.len() {
        for j in i + 1..ivs.len() {
            assert_ne!(ivs[i], ivs[j]);
            assert_ne!(envelopes[i], envelopes[j]);
        }
    }

    let a = CORE.vault().wrap(w.bob.private_key().unwrap(), "pw").unwrap();
    let b = CORE.vault().wrap(w.bob.private_key().unwrap(), "pw").unwrap();
    assert_ne!(a.salt, b.salt);
    assert_ne!(a.iv, b.iv);
}

#[tokio::test]
async fn legacy_packed_layout_decrypts() {
    let w = world().await;
    let bob_key = CORE.keys().import_public(w.bob.public_key().as_str()).unwrap();
    let package = CORE
        .cipher()
        .encrypt(b"legacy bytes", "old.bin", "application/octet-stream", &bob_key)
        .unwrap();

    let packed = package.encode(WireFormat::Packed).unwrap();
    assert_eq!(WireFormat::detect(&packed), WireFormat::Packed);
    let parsed = FilePackage::parse(&packed, "old.bin", "application/octet-stream").unwrap();

    let file = CORE
        .cipher()
        .decrypt(&parsed, w.bob.private_key().unwrap())
        .unwrap();
    assert_eq!(file.data, b"legacy bytes");

    let json = package.encode(WireFormat::Json).unwrap();
    assert_eq!(WireFormat::detect(&json), WireFormat::Json);
    assert_eq!(FilePackage::parse(&json, "", "").unwrap(), parsed);
}

#[tokio::test]
async fn handles_are_unique() {
    let w = world().await;
    assert!(matches!(
        CORE.register(&w.relay, "bob", "another").await,
        Err(Error::HandleTaken(_))
    ));
    assert!(matches!(
        CORE.register(&w.relay, "", "x").await,
        Err(Error::InvalidHandle(_))
    ));
}
