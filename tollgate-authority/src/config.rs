//! Authority endpoint configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to reach the license authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// The single POST endpoint all actions are sent to.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://license.tollgate.app/api/v1/authority".to_string(),
            timeout_secs: 30,
            user_agent: concat!("tollgate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AuthorityConfig {
    /// Config pointing at `endpoint` with default timeouts.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
