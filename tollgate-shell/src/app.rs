//! Wiring between the config file and the session controller.

use crate::config::ShellConfig;
use crate::display::describe_event;
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::broadcast;
use tollgate_authority::HttpAuthority;
use tollgate_license::{SignatureVerifier, SystemClock};
use tollgate_session::{EndReason, SessionController, SessionEvent};
use tracing::warn;

/// Builds a controller talking to the configured authority.
///
/// A missing or unreadable public key does not fail here: the controller
/// starts and rejects every license until a key is installed.
pub fn build_controller(config: &ShellConfig) -> Result<SessionController> {
    let authority =
        HttpAuthority::new(config.authority.clone()).context("Failed to configure license authority")?;
    let verifier = SignatureVerifier::load(&config.public_key_path());
    Ok(SessionController::new(
        Arc::new(authority),
        Arc::new(verifier),
        Arc::new(SystemClock),
        config.session_config(),
    ))
}

/// Prints session events until the session ends.
///
/// Returns the end reason, or `None` if the event stream closed first.
pub async fn follow_session(
    mut events: broadcast::Receiver<SessionEvent>,
    mut out: impl Write,
) -> Result<Option<EndReason>> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Display fell behind, skipped {skipped} session events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(None),
        };
        writeln!(out, "{}", describe_event(&event)).context("Failed to write to terminal")?;
        if let SessionEvent::LoggedOut { reason } = event {
            return Ok(Some(reason));
        }
    }
}
