//! Idle wait/wake for an actor whose inbox is empty.
//!
//! One atomic word per actor moves between three states. The owner parks
//! only after announcing `PARKED`, and a producer unparks only if it swaps
//! that announcement away, so a notification racing with the owner's
//! empty-check-then-park sequence is never lost.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

const EMPTY: u32 = 0;
const PARKED: u32 = 1;
const NOTIFIED: u32 = 2;

/// Per-actor signal word used to sleep on an empty inbox.
#[derive(Debug, Default)]
pub struct IdleSignal {
    state: AtomicU32,
    owner: OnceLock<Thread>,
}

impl IdleSignal {
    /// Creates an unbound signal with no pending notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the signal to the calling thread, the only one allowed to wait.
    pub fn bind_current(&self) {
        let _ = self.owner.set(thread::current());
    }

    /// Wakes the owner if it is waiting, or makes its next wait return
    /// immediately.
    pub fn notify(&self) {
        if self.state.swap(NOTIFIED, Ordering::AcqRel) == PARKED {
            if let Some(owner) = self.owner.get() {
                owner.unpark();
            }
        }
    }

    /// Blocks the owner until notified or until `timeout` elapses.
    ///
    /// Returns true if a notification was consumed. A pending notification
    /// makes this return at once. Must only be called from the bound thread.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        debug_assert!(
            self.owner.get().map(Thread::id) == Some(thread::current().id()),
            "idle wait from a thread that does not own the signal"
        );

        if self
            .state
            .compare_exchange(EMPTY, PARKED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Only a producer changes the word behind our back: consume it.
            self.state.store(EMPTY, Ordering::Release);
            return true;
        }

        // A timeout past the end of `Instant` is no deadline at all.
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        while self.state.load(Ordering::Acquire) == PARKED {
            match deadline {
                None => thread::park(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
            }
        }

        self.state.swap(EMPTY, Ordering::AcqRel) == NOTIFIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn pending_notification_skips_the_wait() {
        let signal = IdleSignal::new();
        signal.bind_current();
        signal.notify();
        assert!(signal.wait(None));
        // Consumed: the next wait sleeps until the timeout.
        assert!(!signal.wait(Some(Duration::from_millis(5))));
    }

    #[test]
    fn timeout_expires_without_notification() {
        let signal = IdleSignal::new();
        signal.bind_current();
        let started = Instant::now();
        assert!(!signal.wait(Some(Duration::from_millis(20))));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn notify_wakes_a_parked_owner() {
        let signal = Arc::new(IdleSignal::new());
        let (bound_tx, bound_rx) = std::sync::mpsc::channel();
        let owner = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                signal.bind_current();
                bound_tx.send(()).unwrap();
                signal.wait(Some(Duration::from_secs(10)))
            })
        };

        bound_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        let notified_at = Instant::now();
        signal.notify();
        assert!(owner.join().unwrap());
        assert!(notified_at.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn unrepresentable_timeout_waits_for_notification() {
        let signal = Arc::new(IdleSignal::new());
        let (bound_tx, bound_rx) = std::sync::mpsc::channel();
        let owner = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                signal.bind_current();
                bound_tx.send(()).unwrap();
                signal.wait(Some(Duration::MAX))
            })
        };

        bound_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        signal.notify();
        assert!(owner.join().unwrap());
    }
}
