//! Shared test helpers for license tests.

#![allow(dead_code)]

use ed25519_dalek::{Signer, SigningKey};
use std::sync::Arc;
use tollgate_license::{LicensePayload, LicenseStateMachine, SignatureVerifier};

/// Fixed "now" used by state tests (2025-01-01T00:00:00Z).
pub const NOW: u64 = 1_735_689_600;

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// A key pair the verifier does not trust.
pub fn rogue_keypair() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// Verifier trusting [`test_keypair`].
pub fn test_verifier() -> Arc<SignatureVerifier> {
    let (_, pk) = test_keypair();
    Arc::new(SignatureVerifier::from_bytes(&pk).unwrap())
}

/// State machine trusting [`test_keypair`].
pub fn test_machine() -> LicenseStateMachine {
    LicenseStateMachine::new(test_verifier())
}

/// Builds a payload whose signature is made by `signing_key` over its token.
pub fn signed_payload(
    signing_key: &SigningKey,
    user: &str,
    expires_at: u64,
    blocked: bool,
) -> LicensePayload {
    let token = format!("{user}|{expires_at}|{blocked}").into_bytes();
    let signature = signing_key.sign(&token).to_bytes().to_vec();
    LicensePayload {
        user: user.to_string(),
        expires_at,
        blocked,
        token,
        signature: Some(signature),
    }
}

/// A valid payload from the trusted key.
pub fn trusted_payload(expires_at: u64, blocked: bool) -> LicensePayload {
    let (sk, _) = test_keypair();
    signed_payload(&sk, "alice", expires_at, blocked)
}
