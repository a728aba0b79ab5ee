//! Terminal input and output helpers.

use std::io::{self, Write};

use anyhow::Result;
use campusauth_core::Notifier;

/// Prints session alerts (failed login, expired session) on stderr so they
/// show up even when `RUST_LOG` hides the tracing output.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{}", alert_line(message));
    }
}

fn alert_line(message: &str) -> String {
    format!("✗ {}", message)
}

/// Read one trimmed line from stdin after printing `label`.
pub fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Pick the login email: the one given on the command line, else ask,
/// offering the last used address as the default for an empty answer.
pub fn resolve_email(
    given: Option<String>,
    last: Option<&str>,
    ask: impl FnOnce(&str) -> Result<String>,
) -> Result<String> {
    if let Some(email) = given {
        return Ok(email);
    }

    match last.filter(|e| !e.is_empty()) {
        Some(last) => {
            let answer = ask(&format!("Email [{}]: ", last))?;
            Ok(if answer.is_empty() { last.to_string() } else { answer })
        }
        None => ask("Email: "),
    }
}
