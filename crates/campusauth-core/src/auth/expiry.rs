//! Cancellable one-shot timer that ends a session at its expiry time.

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// What to do when an armed timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpiryAction {
    /// Clear the session and send the user to the login screen.
    ClearAndRedirect,
    /// Run the full logout workflow.
    Logout,
}

#[derive(Debug)]
struct Armed {
    generation: u64,
    token: Option<String>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Slot {
    armed: Option<Armed>,
    next_generation: u64,
}

/// At most one pending expiry per store. Arming replaces (and aborts) the
/// previous timer, so repeated profile refreshes never stack callbacks.
#[derive(Debug, Default)]
pub(crate) struct ExpiryTimer {
    slot: Mutex<Slot>,
}

impl ExpiryTimer {
    /// Spawn the task built by `make` for the session holding `token`.
    ///
    /// `make` receives the generation the task must pass to [`claim`] when it
    /// fires. The slot stays locked until the task is registered, so even a
    /// zero-delay task cannot claim before it is recorded.
    ///
    /// [`claim`]: ExpiryTimer::claim
    pub(crate) fn arm<F, Fut>(&self, token: Option<String>, make: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        let generation = slot.next_generation;
        slot.next_generation += 1;

        let handle = tokio::spawn(make(generation));
        if let Some(previous) = slot.armed.replace(Armed {
            generation,
            token,
            handle,
        }) {
            debug!(generation = previous.generation, "Replacing pending expiry timer");
            previous.handle.abort();
        }
    }

    /// Called by a firing task. Returns the token the timer was armed for if
    /// `generation` is still the live timer, and disarms it.
    pub(crate) fn claim(&self, generation: u64) -> Option<Option<String>> {
        let mut slot = self.slot.lock();
        if slot.armed.as_ref().is_some_and(|armed| armed.generation == generation) {
            slot.armed.take().map(|armed| armed.token)
        } else {
            None
        }
    }

    /// Abort the pending timer, if any. Returns whether one was pending.
    pub(crate) fn cancel(&self) -> bool {
        match self.slot.lock().armed.take() {
            Some(armed) => {
                debug!(generation = armed.generation, "Cancelled expiry timer");
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.slot.lock().armed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn counting_task(
        timer: &Arc<ExpiryTimer>,
        hits: &Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl FnOnce(u64) -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>> {
        let timer = Arc::clone(timer);
        let hits = Arc::clone(hits);
        move |generation| {
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                if timer.claim(generation).is_some() {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_replaces_pending_timer() {
        let timer = Arc::new(ExpiryTimer::default());
        let hits = Arc::new(AtomicUsize::new(0));

        timer.arm(None, counting_task(&timer, &hits, Duration::from_secs(5)));
        timer.arm(None, counting_task(&timer, &hits, Duration::from_secs(10)));
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let timer = Arc::new(ExpiryTimer::default());
        let hits = Arc::new(AtomicUsize::new(0));

        timer.arm(Some("t1".to_string()), counting_task(&timer, &hits, Duration::from_secs(1)));
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_claim_returns_armed_token_once() {
        let timer = ExpiryTimer::default();
        timer.arm(Some("t1".to_string()), |_| std::future::pending::<()>());

        assert_eq!(timer.claim(99), None);
        assert_eq!(timer.claim(0), Some(Some("t1".to_string())));
        assert_eq!(timer.claim(0), None);
    }
}
