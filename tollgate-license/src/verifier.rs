//! Ed25519 signature verification against the trusted authority key.
//!
//! The verifier is loaded once at process start. If the key cannot be
//! loaded it stays in the unavailable state and every verification fails,
//! so a missing or corrupted key file never grants trust.

use crate::error::{LicenseError, LicenseResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, VerifyingKey};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

/// Length of a raw Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Verifies detached signatures produced by the license authority.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: Result<VerifyingKey, String>,
}

impl SignatureVerifier {
    /// Builds a verifier from raw public key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::KeyMaterial`] if the bytes are not a valid
    /// Ed25519 point.
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> LicenseResult<Self> {
        let key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| LicenseError::KeyMaterial(format!("invalid Ed25519 key: {e}")))?;
        Ok(Self { key: Ok(key) })
    }

    /// Builds a verifier from key file contents.
    ///
    /// Accepts a PEM `PUBLIC KEY` (SPKI), 64 hex characters, or 32 raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::KeyMaterial`] if none of the formats parse.
    pub fn from_key_material(material: &[u8]) -> LicenseResult<Self> {
        if let Ok(raw) = <&[u8; PUBLIC_KEY_LEN]>::try_from(material) {
            return Self::from_bytes(raw);
        }

        let text = std::str::from_utf8(material)
            .map_err(|_| LicenseError::KeyMaterial("key file is neither text nor 32 raw bytes".into()))?
            .trim();

        if text.starts_with("-----BEGIN") {
            let key = VerifyingKey::from_public_key_pem(text)
                .map_err(|e| LicenseError::KeyMaterial(format!("invalid PEM public key: {e}")))?;
            return Ok(Self { key: Ok(key) });
        }

        let decoded = hex::decode(text)
            .map_err(|e| LicenseError::KeyMaterial(format!("invalid hex public key: {e}")))?;
        let raw: [u8; PUBLIC_KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            LicenseError::KeyMaterial(format!("expected {PUBLIC_KEY_LEN} key bytes, got {}", v.len()))
        })?;
        Self::from_bytes(&raw)
    }

    /// Loads the trusted key from `path`.
    ///
    /// Never fails: on any error the returned verifier is unavailable and
    /// rejects every signature.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let loaded = fs::read(path)
            .map_err(|e| LicenseError::KeyMaterial(format!("cannot read {}: {e}", path.display())))
            .and_then(|material| Self::from_key_material(&material));

        match loaded {
            Ok(verifier) => {
                info!("Public key loaded from {}", path.display());
                verifier
            }
            Err(e) => {
                error!("Signature verification unavailable: {e}");
                Self::unavailable(e.to_string())
            }
        }
    }

    /// Returns a verifier that rejects everything.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            key: Err(reason.into()),
        }
    }

    /// Returns true if a trusted key is loaded.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.key.is_ok()
    }

    /// Returns why verification is unavailable, if it is.
    #[must_use]
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.key.as_ref().err().map(String::as_str)
    }

    /// Verifies `signature` over `message`.
    ///
    /// Malformed signatures and an unavailable key both yield `false`.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = &self.key else {
            debug!("Signature rejected: verification unavailable");
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            debug!("Signature rejected: malformed signature bytes");
            return false;
        };
        key.verify_strict(message, &signature).is_ok()
    }

    /// Verifies a base64-encoded signature over `message`.
    ///
    /// This is the check offered to the host shell before it trusts any
    /// license data shown to the user.
    #[must_use]
    pub fn verify_base64(&self, message: &[u8], signature_b64: &str) -> bool {
        match BASE64.decode(signature_b64.trim()) {
            Ok(signature) => self.verify(message, &signature),
            Err(_) => {
                debug!("Signature rejected: invalid base64");
                false
            }
        }
    }
}
