use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Today's date on the local calendar.
pub fn current_date() -> NaiveDate {
    Local::now().date_naive()
}

struct WatcherShared {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Re-evaluates "today" on a low-frequency tick and reports when the local
/// date rolls over, so the shell can move the displayed date forward. The
/// watcher holds no tracker data and never mutates the ledger. `stop` (also
/// run on drop) is the cancellation point: it wakes the timed wait
/// immediately and joins the thread.
pub struct TodayWatcher {
    shared: Arc<WatcherShared>,
    handle: Option<JoinHandle<()>>,
}

impl TodayWatcher {
    /// One-minute tick, matching how often a dashboard needs to notice
    /// midnight.
    pub fn spawn_default(on_change: impl Fn(NaiveDate) + Send + 'static) -> Self {
        Self::spawn(Duration::from_secs(60), on_change)
    }

    pub fn spawn(interval: Duration, on_change: impl Fn(NaiveDate) + Send + 'static) -> Self {
        let shared = Arc::new(WatcherShared {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            let mut last = current_date();
            loop {
                {
                    let mut stopped = thread_shared.stopped.lock();
                    if *stopped {
                        break;
                    }
                    thread_shared.wake.wait_for(&mut stopped, interval);
                    if *stopped {
                        break;
                    }
                }
                let now = current_date();
                if now != last {
                    debug!(%now, "local date rolled over");
                    last = now;
                    on_change(now);
                }
            }
        });
        Self {
            shared,
            handle: Some(handle),
        }
    }

    /// Stops the tick and joins the thread. Safe to call more than once.
    pub fn stop(&mut self) {
        *self.shared.stopped.lock() = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TodayWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn stop_interrupts_a_long_interval() {
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        let mut watcher = TodayWatcher::spawn(Duration::from_secs(3600), move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        let started = Instant::now();
        watcher.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        // Stopping again is a no-op.
        watcher.stop();
    }

    #[test]
    fn drop_joins_without_waiting_for_the_tick() {
        let watcher = TodayWatcher::spawn(Duration::from_secs(3600), |_| {});
        let started = Instant::now();
        drop(watcher);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
