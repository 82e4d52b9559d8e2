use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Shared "last request time" that spaces dispatches at least `min_delay`
/// apart.
///
/// Each caller reserves its dispatch slot under the lock and sleeps outside
/// it, so concurrent callers queue up one delay apart instead of racing the
/// same check.
#[derive(Debug)]
pub struct Pacer {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Sleeps until the caller may dispatch and returns the dispatch instant.
    pub async fn wait_turn(&self) -> Instant {
        let slot = {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => (previous + self.min_delay).max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "pacing request");
            sleep_until(slot).await;
        }
        slot
    }

    /// Moves the reference point to now after a call finishes, so the next
    /// dispatch is spaced from the completion rather than the start.
    pub async fn mark_completed(&self) {
        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        if last.map_or(true, |previous| previous < now) {
            *last = Some(now);
        }
    }

    pub async fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().await
    }
}
