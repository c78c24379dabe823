//! Host machine identity.
//!
//! Produces a stable identifier for this installation by hashing hardware
//! and OS identifiers. The authority uses it to bind a license key to a
//! machine; it survives reboots but changes with the hardware.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use tollgate_license::{MachineIdentity, UNKNOWN_MACHINE_ID};

/// Facts about the host, shown by `tollgate info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub os_name: String,
    pub os_version: String,
    pub hostname: String,
    pub arch: String,
}

impl HostInfo {
    #[must_use]
    pub fn collect() -> Self {
        Self {
            os_name: env::consts::OS.to_string(),
            os_version: os_version(),
            hostname: hostname().unwrap_or_else(|| "unknown".to_string()),
            arch: env::consts::ARCH.to_string(),
        }
    }
}

/// Identity of the current machine.
///
/// Falls back to [`UNKNOWN_MACHINE_ID`] when neither a platform machine id
/// nor a hostname is available.
#[must_use]
pub fn current_machine() -> MachineIdentity {
    let platform_id = platform_machine_id();
    let host = hostname();
    if platform_id.is_none() && host.is_none() {
        return MachineIdentity::new(UNKNOWN_MACHINE_ID);
    }

    let mut components = vec![env::consts::OS.to_string(), env::consts::ARCH.to_string()];
    components.extend(host);
    components.extend(platform_id);
    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        components.push(user);
    }
    MachineIdentity::new(fingerprint(&components))
}

/// Hex SHA-256 over the `|`-joined components.
#[must_use]
pub fn fingerprint(components: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(components.join("|").as_bytes());
    hex::encode(hasher.finalize())
}

fn hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.trim().is_empty())
}

fn os_version() -> String {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find_map(|l| l.strip_prefix("VERSION_ID="))
                    .map(|v| v.trim_matches('"').to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        "unknown".to_string()
    }
}

fn platform_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    // TODO: read MachineGuid from the registry on Windows.
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}
