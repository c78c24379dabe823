//! Tollgate command-line host
//!
//! Logs in against the license authority, keeps the session under watch
//! until it ends or the user presses Ctrl-C, and exposes the account flows.
//!
//! Usage:
//!   tollgate login --user alice
//!   tollgate activate <LICENSE_KEY>
//!   tollgate info

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tollgate_authority::{Credentials, PasswordReset, Registration};
use tollgate_session::{Enrollment, SessionController, SessionInfo};
use tollgate_shell::{
    build_controller, current_machine, describe_state, follow_session, format_remaining,
    public_ip, HostInfo, ShellConfig,
};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "Tollgate license client", version)]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the license authority endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the trusted public key file
    #[arg(long)]
    public_key: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and watch the session
    Login {
        #[arg(short, long)]
        user: String,
        #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Activate a license key on this machine and watch the session
    Activate { key: String },
    /// Create an account
    Register {
        #[arg(short, long)]
        user: String,
        #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        country: String,
    },
    /// Request a password reset token by email
    ForgotPassword { email: String },
    /// Set a new password with a reset token
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        token: String,
        #[arg(long, env = "TOLLGATE_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    /// Check a base64 signature over a token with the trusted key
    VerifySignature { token: String, signature: String },
    /// Print this machine's identity
    MachineId,
    /// Print application and platform information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_target(false)
        .compact()
        .init();

    let mut config = ShellConfig::load(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.authority.endpoint = endpoint;
    }
    if let Some(path) = args.public_key {
        config.public_key_path = Some(path);
    }

    match args.command {
        Command::Login { user, password } => {
            let controller = build_controller(&config)?;
            let machine = current_machine();
            let ip = public_ip(&config.ip_lookup_url, config.ip_lookup_timeout()).await;
            let session = controller
                .login(&Credentials { user, password }, &machine, &ip)
                .await
                .context("Login failed")?;
            watch(&controller, &session).await
        }
        Command::Activate { key } => {
            let controller = build_controller(&config)?;
            let session = controller
                .activate_license_key(&key, &current_machine())
                .await
                .context("License activation failed")?;
            watch(&controller, &session).await
        }
        Command::Register {
            user,
            password,
            email,
            phone,
            country,
        } => {
            let controller = build_controller(&config)?;
            let registration = Registration {
                user,
                password,
                email,
                phone,
                country,
            };
            match controller
                .register(&registration, &current_machine())
                .await
                .context("Registration failed")?
            {
                Enrollment::Registered { message } => {
                    println!("{}", message.as_deref().unwrap_or("Account created"));
                    println!("Activate a license key with `tollgate activate <KEY>`");
                    Ok(())
                }
                Enrollment::Started(session) => watch(&controller, &session).await,
            }
        }
        Command::ForgotPassword { email } => {
            let controller = build_controller(&config)?;
            let message = controller
                .request_password_reset(&email)
                .await
                .context("Password reset request failed")?;
            println!("{}", message.as_deref().unwrap_or("Reset token sent"));
            Ok(())
        }
        Command::ResetPassword {
            email,
            token,
            new_password,
        } => {
            let controller = build_controller(&config)?;
            let reset = PasswordReset {
                email,
                reset_token: token,
                new_password,
            };
            let message = controller
                .complete_password_reset(&reset)
                .await
                .context("Password reset failed")?;
            println!("{}", message.as_deref().unwrap_or("Password updated"));
            Ok(())
        }
        Command::VerifySignature { token, signature } => {
            let controller = build_controller(&config)?;
            if controller.verify_signature(token.as_bytes(), &signature) {
                println!("Signature valid");
                Ok(())
            } else {
                anyhow::bail!("Signature invalid")
            }
        }
        Command::MachineId => {
            println!("{}", current_machine().as_str());
            Ok(())
        }
        Command::Info => {
            let host = HostInfo::collect();
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            println!("Platform: {} {} ({})", host.os_name, host.os_version, host.arch);
            println!("Host:     {}", host.hostname);
            let config_path = args.config.or_else(ShellConfig::default_path);
            match config_path {
                Some(path) => println!("Config:   {}", path.display()),
                None => println!("Config:   none"),
            }
            Ok(())
        }
    }
}

async fn watch(controller: &SessionController, session: &SessionInfo) -> Result<()> {
    let events = controller.subscribe();
    println!(
        "Logged in as {}. License valid for {}",
        session.user,
        format_remaining(session.remaining)
    );

    tokio::select! {
        ended = follow_session(events, std::io::stdout()) => {
            if let Some(reason) = ended? {
                info!("Session ended: {reason}");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            controller.logout();
            println!("Logged out");
        }
    }
    println!("{}", describe_state(&controller.trust_state()));
    Ok(())
}
