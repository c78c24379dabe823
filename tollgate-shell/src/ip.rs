//! Public IP lookup for the login request.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Reported when the lookup fails.
pub const UNKNOWN_IP: &str = "unknown";

#[derive(Debug, Deserialize)]
struct IpEcho {
    ip: String,
}

/// Asks an IP echo service for this host's public address.
///
/// Never fails: any error yields [`UNKNOWN_IP`].
pub async fn public_ip(url: &str, timeout: Duration) -> String {
    match lookup(url, timeout).await {
        Ok(ip) if !ip.trim().is_empty() => {
            debug!("Public IP resolved");
            ip.trim().to_string()
        }
        Ok(_) => {
            warn!("IP lookup returned an empty address");
            UNKNOWN_IP.to_string()
        }
        Err(e) => {
            warn!("IP lookup failed: {e}");
            UNKNOWN_IP.to_string()
        }
    }
}

async fn lookup(url: &str, timeout: Duration) -> Result<String, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let echo: IpEcho = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(echo.ip)
}
