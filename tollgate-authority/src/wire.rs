//! JSON shapes exchanged with the authority.
//!
//! Requests are tagged by an `action` field. Responses are loosely typed on
//! the server side: `exp` may be a number or a numeric string and `blocked`
//! may be a bool, a number or a string, so both are coerced here and nowhere
//! else.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tollgate_license::LicensePayload;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(tag = "action")]
pub(crate) enum Request<'a> {
    #[serde(rename = "login")]
    Login {
        user: &'a str,
        pass: &'a str,
        mid: &'a str,
        ip: &'a str,
    },
    #[serde(rename = "register")]
    Register {
        user: &'a str,
        pass: &'a str,
        email: &'a str,
        phone: &'a str,
        country: &'a str,
        mid: &'a str,
    },
    #[serde(rename = "verifyKey")]
    VerifyKey {
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<&'a str>,
        key: &'a str,
        mid: &'a str,
    },
    #[serde(rename = "forgotPassword")]
    ForgotPassword { email: &'a str },
    #[serde(rename = "resetPassword")]
    ResetPassword {
        email: &'a str,
        #[serde(rename = "resetToken")]
        reset_token: &'a str,
        #[serde(rename = "newPassword")]
        new_password: &'a str,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Flag {
    pub(crate) fn is_set(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Epoch {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Epoch {
    /// Seconds since the epoch; anything unparseable or negative is 0.
    pub(crate) fn secs(&self) -> u64 {
        match self {
            Self::Int(n) => *n,
            Self::Float(f) => float_secs(*f),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(float_secs))
                    .unwrap_or(0)
            }
        }
    }
}

fn float_secs(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
}

/// Any authority response. Absent fields stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    pub success: Option<Flag>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub exp: Option<Epoch>,
    #[serde(default)]
    pub blocked: Option<Flag>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Response {
    /// True when the authority signalled success in either dialect.
    pub(crate) fn accepted(&self) -> bool {
        self.success.as_ref().is_some_and(Flag::is_set) || self.status.as_deref() == Some("ok")
    }

    /// True when the authority explicitly declined in either dialect.
    pub(crate) fn refused(&self) -> bool {
        !self.accepted() && (self.success.is_some() || self.status.is_some())
    }

    /// True when the response carries a license token.
    pub(crate) fn has_license(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Server message, or `fallback` if none was sent.
    pub(crate) fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// Normalizes the license fields.
    ///
    /// Missing fields become values that cannot authorize anything: an empty
    /// token, no signature, expiry 0.
    pub(crate) fn license(&self, fallback_user: &str) -> LicensePayload {
        let signature = self.signature.as_deref().and_then(|s| match BASE64.decode(s.trim()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("Discarding undecodable signature: {e}");
                None
            }
        });

        LicensePayload {
            user: self
                .user
                .clone()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| fallback_user.to_string()),
            expires_at: self.exp.as_ref().map_or(0, Epoch::secs),
            blocked: self.blocked.as_ref().is_some_and(Flag::is_set),
            token: self.token.clone().unwrap_or_default().into_bytes(),
            signature,
        }
    }
}
