use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use super::pacing::Pacer;

type InFlight = Mutex<BTreeMap<u64, Instant>>;

/// Admits at most one new dispatch per minimum-delay window and tracks the
/// operations that are still running.
///
/// Completion order is not preserved: a short call queued after a long one
/// may finish first.
#[derive(Debug)]
pub struct RequestQueue {
    pacer: Arc<Pacer>,
    in_flight: InFlight,
    next_id: AtomicU64,
}

impl RequestQueue {
    pub fn new(min_delay: Duration) -> Self {
        Self::with_pacer(Arc::new(Pacer::new(min_delay)))
    }

    pub fn with_pacer(pacer: Arc<Pacer>) -> Self {
        Self {
            pacer,
            in_flight: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Waits for a dispatch slot, runs `operation` and returns its output.
    ///
    /// The entry is removed from the in-flight set when the operation
    /// settles, fails, or the returned future is dropped.
    pub async fn enqueue<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let dispatched_at = self.pacer.wait_turn().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let _entry = InFlightEntry::register(&self.in_flight, id, dispatched_at);
        tracing::debug!(request_id = id, in_flight = self.in_flight(), "dispatching queued request");
        operation().await
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Ids of running operations, oldest first.
    pub fn in_flight_ids(&self) -> Vec<u64> {
        lock(&self.in_flight).keys().copied().collect()
    }
}

struct InFlightEntry<'a> {
    in_flight: &'a InFlight,
    id: u64,
}

impl<'a> InFlightEntry<'a> {
    fn register(in_flight: &'a InFlight, id: u64, dispatched_at: Instant) -> Self {
        lock(in_flight).insert(id, dispatched_at);
        Self { in_flight, id }
    }
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.id);
    }
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, BTreeMap<u64, Instant>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn tracks_operation_while_running() {
        let queue = RequestQueue::new(Duration::from_millis(100));
        let handle = &queue;
        let seen = queue
            .enqueue(move || async move { handle.in_flight_ids() })
            .await;
        assert_eq!(seen, vec![0]);
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn removes_failed_operation() {
        let queue = RequestQueue::new(Duration::from_millis(100));
        let result: Result<(), &str> = queue.enqueue(|| async { Err("boom") }).await;
        assert_eq!(result, Err("boom"));
        assert!(queue.in_flight_ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn removes_cancelled_operation() {
        let queue = Arc::new(RequestQueue::new(Duration::from_millis(100)));
        let task = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .enqueue(|| async { sleep(Duration::from_secs(60)).await })
                    .await
            })
        };

        sleep(Duration::from_millis(10)).await;
        assert_eq!(queue.in_flight(), 1);
        task.abort();
        let _ = task.await;
        assert_eq!(queue.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_dispatches_but_not_completions() {
        let queue = Arc::new(RequestQueue::new(Duration::from_millis(1000)));
        let finished = Arc::new(Mutex::new(Vec::new()));

        let spawn = |label: &'static str, work: Duration| {
            let queue = queue.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                let dispatched = queue
                    .enqueue(|| async move {
                        let dispatched = Instant::now();
                        sleep(work).await;
                        dispatched
                    })
                    .await;
                finished.lock().unwrap().push(label);
                dispatched
            })
        };

        let slow = spawn("slow", Duration::from_secs(5));
        let fast = spawn("fast", Duration::from_millis(10));
        let slow_at = slow.await.unwrap();
        let fast_at = fast.await.unwrap();

        let gap = if fast_at > slow_at {
            fast_at - slow_at
        } else {
            slow_at - fast_at
        };
        assert!(gap >= Duration::from_millis(1000));
        assert_eq!(*finished.lock().unwrap(), vec!["fast", "slow"]);
        assert_eq!(queue.in_flight(), 0);
    }
}
