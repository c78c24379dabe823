//! Shell configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tollgate_authority::AuthorityConfig;
use tollgate_session::SessionConfig;
use tracing::debug;

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "tollgate";
/// Config file name inside [`APP_DIR`].
pub const CONFIG_FILE: &str = "config.json";
/// Public key file name inside [`APP_DIR`].
pub const PUBLIC_KEY_FILE: &str = "ed25519_public.pem";

/// Host configuration, read from JSON. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// License authority endpoint settings.
    pub authority: AuthorityConfig,
    /// Trusted Ed25519 public key (PEM, hex, or 32 raw bytes).
    pub public_key_path: Option<PathBuf>,
    pub countdown_secs: u64,
    pub revalidation_secs: u64,
    pub grace_secs: u64,
    pub rejection_grace_secs: u64,
    /// IP echo service returning `{"ip": "..."}`.
    pub ip_lookup_url: String,
    pub ip_lookup_timeout_secs: u64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            authority: AuthorityConfig::default(),
            public_key_path: None,
            countdown_secs: session.countdown_period.as_secs(),
            revalidation_secs: session.revalidation_period.as_secs(),
            grace_secs: session.grace_delay.as_secs(),
            rejection_grace_secs: session.rejection_grace_delay.as_secs(),
            ip_lookup_url: "https://api.ipify.org?format=json".to_string(),
            ip_lookup_timeout_secs: 5,
        }
    }
}

impl ShellConfig {
    /// `<config dir>/tollgate/config.json`, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads the config.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Parses a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Where to read the trusted public key from.
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        self.public_key_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_default()
                .join(APP_DIR)
                .join(PUBLIC_KEY_FILE)
        })
    }

    /// Session timings. Periods are at least one second.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            countdown_period: Duration::from_secs(self.countdown_secs.max(1)),
            revalidation_period: Duration::from_secs(self.revalidation_secs.max(1)),
            grace_delay: Duration::from_secs(self.grace_secs),
            rejection_grace_delay: Duration::from_secs(self.rejection_grace_secs),
            ..SessionConfig::default()
        }
    }

    /// Timeout for the public IP lookup.
    #[must_use]
    pub fn ip_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.ip_lookup_timeout_secs)
    }
}
