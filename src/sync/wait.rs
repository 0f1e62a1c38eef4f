use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// How a [`BreakableWait::sleep`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration passed.
    Elapsed,
    /// `release()` cut the sleep short.
    Released,
}

/// A sleep that an external signal can cut short.
///
/// Workers use this for backoff and idle pauses so that shutdown (or a
/// configuration change) does not have to wait out a long interval. A
/// `release()` while nothing is sleeping is remembered and consumed by the
/// next `sleep` call, which then returns immediately.
#[derive(Debug, Default)]
pub struct BreakableWait {
    released: Mutex<bool>,
    notify: Notify,
}

impl BreakableWait {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `duration`, returning early when released.
    ///
    /// Wake-ups are re-checked against both the release flag and the elapsed
    /// time, so a wake-up that carries neither goes back to sleep for the
    /// remainder.
    pub async fn sleep(&self, duration: Duration) -> WaitOutcome {
        let deadline = Instant::now() + duration;

        loop {
            // Register interest before checking the flag so a release between
            // the check and the await is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.take_released() {
                return WaitOutcome::Released;
            }

            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Elapsed;
            }

            match tokio::time::timeout(deadline - now, notified).await {
                Ok(()) => {
                    if self.take_released() {
                        return WaitOutcome::Released;
                    }
                    // Notification without a release flag: keep waiting.
                }
                Err(_) => return WaitOutcome::Elapsed,
            }
        }
    }

    /// Releases the current (or next) sleeper.
    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.notify.notify_waiters();
    }

    fn take_released(&self) -> bool {
        let mut released = self.released.lock().unwrap();
        std::mem::take(&mut *released)
    }
}
