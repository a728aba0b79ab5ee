//! Command-line parsing.

use std::fmt;

pub const USAGE: &str = "\
Usage: campusauth <command>

Commands:
  login [email]                  Log in (prompts for the password)
  register <name> <email> [role] Create an account and log in (role defaults to student)
  logout                         End the stored session
  status                         Show the restored session state
  whoami                         Refresh and show the current user's profile
  help                           Show this message

Environment:
  CAMPUSAUTH_API_URL       API base URL
  CAMPUSAUTH_TIMEOUT_SECS  Request timeout in seconds
  RUST_LOG                 Log filter (default: warn)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String> },
    Register { name: String, email: String, role: Option<String> },
    Logout,
    Status,
    Whoami,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

impl Command {
    pub fn parse<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Status);
        };

        let command = match name.as_str() {
            "login" => match rest {
                [] => Command::Login { email: None },
                [email] => Command::Login {
                    email: Some(email.clone()),
                },
                _ => return Err(UsageError("login takes at most one argument".to_string())),
            },
            "register" => match rest {
                [name, email] => Command::Register {
                    name: name.clone(),
                    email: email.clone(),
                    role: None,
                },
                [name, email, role] => Command::Register {
                    name: name.clone(),
                    email: email.clone(),
                    role: Some(role.clone()),
                },
                _ => return Err(UsageError("register needs <name> <email> [role]".to_string())),
            },
            "logout" => Command::Logout,
            "status" => Command::Status,
            "whoami" => Command::Whoami,
            "help" | "-h" | "--help" => Command::Help,
            other => return Err(UsageError(format!("Unknown command: {}", other))),
        };

        if !rest.is_empty() && matches!(command, Command::Logout | Command::Status | Command::Whoami) {
            return Err(UsageError(format!("{} takes no arguments", name)));
        }
        Ok(command)
    }
}
