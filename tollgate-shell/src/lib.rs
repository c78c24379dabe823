//! Command-line host for the Tollgate license trust engine.
//!
//! Supplies what the engine expects from its host: a machine identity, the
//! client's public IP, configuration, and a place to show session events.

pub mod app;
pub mod config;
pub mod display;
pub mod ip;
pub mod machine;

pub use app::{build_controller, follow_session};
pub use config::ShellConfig;
pub use display::{describe_event, describe_state, format_remaining};
pub use ip::{public_ip, UNKNOWN_IP};
pub use machine::{current_machine, fingerprint, HostInfo};
