//! # Hybrid Encryption Demo
//!
//! Registers two users on an in-memory relay, sends a file from one to the
//! other, and shows what the relay actually stores.
//!
//! ## Run
//!
//! ```bash
//! cargo run --example hybrid_demo
//! ```

use vajra_core::{CoreConfig, MemoryRelay, Relay, VajraCore};

#[tokio::main]
async fn main() {
    println!("=== Vajra Core: Hybrid File Encryption Demo ===\n");

    let core = VajraCore::new(CoreConfig::legacy()).expect("Failed to build core");
    let relay = MemoryRelay::new();

    // Step 1: Register
    println!("Step 1: Registering alice and bob (RSA-2048, PBKDF2 100k)...");
    let alice = core
        .register(&relay, "alice", "p@ss1")
        .await
        .expect("Failed to register alice");
    let bob = core
        .register(&relay, "bob", "correct horse")
        .await
        .expect("Failed to register bob");
    println!(
        "  alice fingerprint: {}",
        alice.public_key().fingerprint().expect("fingerprint")
    );
    println!(
        "  bob fingerprint:   {}",
        bob.public_key().fingerprint().expect("fingerprint")
    );
    println!();

    // Step 2: Send
    println!("Step 2: alice sends bob a file...");
    let message = b"The launch codes are in the second drawer.".to_vec();
    let id = core
        .send_file(&relay, &alice, "bob", message.clone(), "note.txt", "text/plain")
        .await
        .expect("Failed to send");
    println!("  relay file id: {}", id);
    println!();

    // Step 3: What the relay sees
    println!("Step 3: What the relay stores...");
    let record = relay.fetch_file(&id).await.expect("Failed to fetch");
    println!("  sender:       {}", record.sender);
    println!("  recipient:    {}", record.recipient);
    println!("  envelope:     {} bytes (RSA-OAEP)", record.package.encrypted_key.len());
    println!("  ciphertext:   {} bytes (AES-256-GCM)", record.package.file_data.len());
    println!(
        "  ciphertext:   {}...",
        hex::encode(&record.package.file_data[..16])
    );
    println!();

    // Step 4: Receive
    println!("Step 4: bob logs in on a new device and decrypts...");
    let bob_again = core
        .restore(&relay, "bob", "correct horse")
        .await
        .expect("Failed to restore bob");
    let file = core
        .receive_file(&relay, &bob_again, &id)
        .await
        .expect("Failed to decrypt");
    println!("  {} ({}): {}", file.file_name, file.file_type, String::from_utf8_lossy(&file.data));
    assert_eq!(file.data, message);
    println!();

    // Step 5: Wrong password
    println!("Step 5: a wrong password...");
    match core.restore(&relay, "bob", "incorrect horse").await {
        Ok(_) => println!("  unexpectedly unlocked!"),
        Err(e) => println!("  rejected: {} (code {})", e, e.code()),
    }

    println!("\n=== Demo Complete ===");
}
