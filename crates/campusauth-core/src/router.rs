//! Navigation capability driven by the session workflows.

use parking_lot::Mutex;
use tracing::info;

/// Landing route for administrators.
pub const ADMIN_ROUTE: &str = "/admin";
/// Landing route for everyone else, and the logout destination.
pub const STUDENT_ROUTE: &str = "/student";
/// Where an expired session is sent.
pub const LOGIN_ROUTE: &str = "/login";

pub trait Router: Send + Sync {
    fn push(&self, path: &str);

    fn current_path(&self) -> String;

    /// Reload the current view from scratch.
    fn reload(&self);
}

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    reloads: usize,
}

/// Router that keeps its history in memory.
///
/// Used by the CLI (where there is no view to switch) and by tests that
/// assert on where a workflow navigated.
#[derive(Debug)]
pub struct MemoryRouter {
    history: Mutex<History>,
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryRouter {
    pub fn new(start: &str) -> Self {
        Self {
            history: Mutex::new(History {
                entries: vec![start.to_string()],
                reloads: 0,
            }),
        }
    }

    /// Every path visited, starting with the initial one.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().entries.clone()
    }

    /// Paths pushed since construction (initial path excluded).
    pub fn pushed(&self) -> Vec<String> {
        self.history.lock().entries[1..].to_vec()
    }

    pub fn reloads(&self) -> usize {
        self.history.lock().reloads
    }
}

impl Router for MemoryRouter {
    fn push(&self, path: &str) {
        info!(path, "Navigating");
        self.history.lock().entries.push(path.to_string());
    }

    fn current_path(&self) -> String {
        self.history
            .lock()
            .entries
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn reload(&self) {
        let mut history = self.history.lock();
        history.reloads += 1;
        info!(path = history.entries.last().map(String::as_str).unwrap_or("/"), "Reloading");
    }
}
