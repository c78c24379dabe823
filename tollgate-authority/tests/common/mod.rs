//! Shared helpers for authority client tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer, SigningKey};
use tollgate_authority::{AuthorityConfig, HttpAuthority};
use wiremock::MockServer;

pub const ENDPOINT_PATH: &str = "/exec";

/// Deterministic authority signing key.
pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[9u8; 32])
}

/// Base64 signature over `token` by [`signing_key`].
pub fn sign_b64(token: &str) -> String {
    BASE64.encode(signing_key().sign(token.as_bytes()).to_bytes())
}

/// Client pointed at the mock server.
pub fn client_for(server: &MockServer) -> HttpAuthority {
    let config = AuthorityConfig {
        timeout_secs: 5,
        ..AuthorityConfig::with_endpoint(format!("{}{ENDPOINT_PATH}", server.uri()))
    };
    HttpAuthority::new(config).unwrap()
}

/// Client pointed at a port nothing listens on.
pub fn unreachable_client() -> HttpAuthority {
    let config = AuthorityConfig {
        timeout_secs: 2,
        ..AuthorityConfig::with_endpoint("http://127.0.0.1:1/exec")
    };
    HttpAuthority::new(config).unwrap()
}
