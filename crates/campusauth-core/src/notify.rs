//! User-visible alerts raised by the workflows.

use tracing::error;

/// Fire-and-forget alert sink (a toast in a browser, stderr in the CLI).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that only logs. Suitable for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        error!(message, "User alert");
    }
}
