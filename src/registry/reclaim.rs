//! Grace-period reclamation on top of `crossbeam-epoch`.
//!
//! Registry lookups run inside a read-side section ([`read`]), which is an
//! epoch pin and never blocks. [`synchronize`] waits until every section
//! that was open when it was called has closed: it defers a completion flag
//! into the epoch collector, which runs deferred work only once all threads
//! pinned at that time have unpinned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_epoch as epoch;
use crossbeam_utils::Backoff;

pub use crossbeam_epoch::Guard;

const SYNC_SLEEP: Duration = Duration::from_micros(50);

/// Opens a read-side critical section. References obtained from the
/// registry stay valid until the returned guard is dropped.
pub fn read() -> Guard {
    epoch::pin()
}

/// Blocks until all read-side sections that might have observed state
/// retired before this call have ended.
pub fn synchronize() {
    let done = Arc::new(AtomicBool::new(false));
    {
        let guard = epoch::pin();
        let flag = Arc::clone(&done);
        guard.defer(move || flag.store(true, Ordering::Release));
        guard.flush();
    }

    let backoff = Backoff::new();
    while !done.load(Ordering::Acquire) {
        // Each flush tries to advance the global epoch and collect expired
        // garbage, including our flag.
        epoch::pin().flush();
        if backoff.is_completed() {
            thread::sleep(SYNC_SLEEP);
        } else {
            backoff.snooze();
        }
    }
}
