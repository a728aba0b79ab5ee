//! campusauth - command-line client for learning-platform sessions.
//!
//! Every invocation restores the stored session first, then runs one command
//! against it. The session lives in `~/.cache/campusauth/storage.json`.

mod cli;
mod config;
mod console;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use campusauth_core::{FileStore, HttpApiClient, MemoryRouter, Router, SessionStore};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Command, USAGE};
use config::Config;
use console::{prompt, resolve_email, StderrNotifier};

/// Log file prefix inside the storage directory
const LOG_FILE_PREFIX: &str = "campusauth.log";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug). When a
/// log directory is available a daily rolling file receives the same events.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .build(dir)
            .map_err(|e| eprintln!("Warning: file logging disabled: {}", e))
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    let storage_dir = config.storage_dir()?;
    let _log_guard = init_tracing(Some(storage_dir.as_path()));
    info!(api = %config.api_base_url, "campusauth starting");

    let api = Arc::new(
        HttpApiClient::new(config.api_base_url.clone(), config.request_timeout())
            .context("Failed to build HTTP client")?,
    );
    let storage = Arc::new(
        FileStore::open(&storage_dir)
            .with_context(|| format!("Failed to open session storage in {}", storage_dir.display()))?,
    );
    let router = Arc::new(MemoryRouter::default());
    let store = SessionStore::new(api, storage, router.clone(), Arc::new(StderrNotifier));

    store.check_auth_state().await;

    match command {
        Command::Login { email } => {
            let email = resolve_email(email, config.last_email.as_deref(), prompt)?;
            if email.is_empty() {
                anyhow::bail!("An email address is required to log in.");
            }
            let password = rpassword::prompt_password("Password: ")?;

            match store.login(&email, &password).await? {
                Some(_) => {
                    println!(
                        "✓ Logged in as {} ({}), landing on {}",
                        email,
                        store.user_role().map(|r| r.to_string()).unwrap_or_else(|| "no role".to_string()),
                        router.current_path()
                    );
                    if let Some(expires_at) = store.session_expires_at() {
                        println!("  Session expires at {}", expires_at.to_rfc3339());
                    }
                }
                None => println!("Server accepted the request but issued no session token."),
            }

            config.last_email = Some(email);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
        }
        Command::Register { name, email, role } => {
            let password = rpassword::prompt_password("Password: ")?;
            let response = store.register(&name, &email, &password, role.as_deref()).await?;

            if response.success {
                println!("✓ Registered {}", email);
                if store.is_authenticated() {
                    println!("  Logged in, landing on {}", router.current_path());
                }
                config.last_email = Some(email);
                if let Err(e) = config.save() {
                    tracing::warn!(error = %e, "Failed to save config");
                }
            } else {
                println!(
                    "Registration not confirmed: {}",
                    response.message.as_deref().unwrap_or("no reason given")
                );
            }
        }
        Command::Logout => {
            let was_authenticated = store.is_authenticated();
            store.logout_and_redirect();
            if was_authenticated {
                println!("✓ Logged out");
            } else {
                println!("No active session; stored session data cleared");
            }
        }
        Command::Status => {
            let state = store.snapshot();
            println!("{}", serde_json::to_string_pretty(&state)?);
            if let Some(expires_at) = store.session_expires_at() {
                println!("expires_at: {}", expires_at.to_rfc3339());
            }
        }
        Command::Whoami => {
            if !store.is_authenticated() {
                anyhow::bail!("Not logged in. Run `campusauth login` first.");
            }
            // Restore already refreshed the profile when a user id was stored
            let user = match store.current_user() {
                Some(user) => user,
                None => store
                    .fetch_user_profile()
                    .await
                    .ok_or_else(|| anyhow::anyhow!(
                        "Profile unavailable: {}",
                        store.auth_error().unwrap_or_else(|| "no user id stored".to_string())
                    ))?,
            };
            println!("{}", user.display_name());
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        // Printed before the session was opened
        Command::Help => {}
    }

    info!("campusauth finished");
    Ok(())
}
