//! Single-flight slot: concurrent callers share one in-flight operation.
//!
//! The operation runs on its own task and holds a guard that clears the slot when the task
//! ends, whether it returned, panicked or was aborted. Callers that give up early do not
//! stop it, so the slot never holds a future nobody drives.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Flight<T> = Shared<BoxFuture<'static, Option<T>>>;
type Slot<T> = Arc<Mutex<Option<(u64, Flight<T>)>>>;

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the slot on drop if it still holds operation `id`.
struct Release<T: Clone + Send + Sync + 'static> {
    slot: Slot<T>,
    id: u64,
}

impl<T: Clone + Send + Sync + 'static> Drop for Release<T> {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if matches!(slot.as_ref(), Some((current, _)) if *current == self.id) {
            *slot = None;
        }
    }
}

pub struct SingleFlight<T: Clone + Send + Sync + 'static> {
    name: &'static str,
    slot: Slot<T>,
    next_id: AtomicU64,
    started: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
            started: AtomicU64::new(0),
        }
    }

    /// Joins the in-flight operation if there is one, otherwise starts `make()` on a new task.
    /// `None` when the operation panicked or was aborted.
    pub async fn run<F, Fut>(&self, make: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut slot = lock(&self.slot);
            match slot.as_ref() {
                Some((_, in_flight)) => {
                    tracing::debug!(operation = self.name, "joining in-flight operation");
                    in_flight.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    self.started.fetch_add(1, Ordering::Relaxed);
                    let release = Release {
                        slot: self.slot.clone(),
                        id,
                    };
                    let op = make();
                    // The slot lock is held until the flight is stored, so `release` cannot
                    // clear it early.
                    let task = tokio::spawn(async move {
                        let _release = release;
                        op.await
                    });
                    let name = self.name;
                    let flight = async move {
                        match task.await {
                            Ok(out) => Some(out),
                            Err(e) => {
                                tracing::warn!(operation = name, error = %e, "operation did not complete");
                                None
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, flight.clone()));
                    flight
                }
            }
        };
        flight.await
    }

    /// True while an operation is in flight.
    pub fn is_pending(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Number of operations actually started (joins are not counted).
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_operation() {
        let flight = Arc::new(SingleFlight::<u32>::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        7
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Some(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.started(), 1);
        assert!(!flight.is_pending());
    }

    #[tokio::test]
    async fn slot_is_released_after_settling() {
        let flight = SingleFlight::<bool>::new("test");
        assert_eq!(flight.run(|| async { true }).await, Some(true));
        assert_eq!(flight.run(|| async { false }).await, Some(false));
        assert_eq!(flight.started(), 2);
    }

    #[tokio::test]
    async fn panicking_operation_releases_the_slot() {
        let flight = SingleFlight::<bool>::new("test");
        let out = flight
            .run(|| async {
                let fail = true;
                if fail {
                    panic!("operation failed");
                }
                true
            })
            .await;

        assert_eq!(out, None);
        assert!(!flight.is_pending());
        assert_eq!(flight.run(|| async { true }).await, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_operation_still_completes_and_releases() {
        let flight = SingleFlight::<u32>::new("test");
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let gave_up = tokio::time::timeout(
            Duration::from_millis(10),
            flight.run(|| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                1
            }),
        )
        .await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!flight.is_pending());

        // A later call starts fresh instead of picking up the abandoned result.
        assert_eq!(flight.run(|| async { 2 }).await, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.started(), 2);
    }
}
