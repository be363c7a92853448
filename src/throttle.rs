//! # Throttle Module
//!
//! Runner a concorrenza limitata per task async differiti.
//!
//! I task partono nell'ordine di input, al massimo `limit` alla volta; quando
//! uno termina parte il successivo in attesa. La chiamata ritorna quando tutti
//! i task sono terminati. Un task che va in panic viene riportato nel proprio
//! slot senza disturbare gli altri, quindi l'esecuzione nel suo insieme non
//! fallisce mai.

use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::error::panic_message;

/// A task that panicked instead of settling normally
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("task panicked: {0}")]
pub struct TaskPanicked(pub String);

/// Run `tasks` with at most `limit` in flight.
///
/// Results come back in input order, whatever the completion order was. A
/// `limit` of zero is treated as one.
pub async fn run<I, F, Fut, T>(limit: usize, tasks: I) -> Vec<Result<T, TaskPanicked>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let limit = limit.max(1);

    let mut settled: Vec<(usize, Result<T, TaskPanicked>)> = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move {
            let outcome = AssertUnwindSafe(async move { task().await })
                .catch_unwind()
                .await
                .map_err(|payload| TaskPanicked(panic_message(payload.as_ref())));
            (index, outcome)
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    settled.sort_by_key(|(index, _)| *index);
    settled.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Gauge {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }

        /// Occupies a slot until dropped, unwinding included.
        fn slot(self: &Arc<Self>) -> Slot {
            self.enter();
            Slot(self.clone())
        }
    }

    struct Slot(Arc<Gauge>);

    impl Drop for Slot {
        fn drop(&mut self) {
            self.0.exit();
        }
    }

    #[tokio::test]
    async fn test_never_exceeds_limit_and_survives_failures() {
        let gauge = Arc::new(Gauge::default());
        let finished = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let gauge = gauge.clone();
                let finished = finished.clone();
                move || async move {
                    gauge.enter();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    gauge.exit();
                    finished.fetch_add(1, Ordering::SeqCst);
                    if i == 1 {
                        Err(format!("task {i} failed"))
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();

        let results = run(2, tasks).await;

        assert_eq!(finished.load(Ordering::SeqCst), 4);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Ok(Ok(0)));
        assert_eq!(results[1], Ok(Err("task 1 failed".to_string())));
        assert_eq!(results[3], Ok(Ok(3)));
    }

    #[tokio::test]
    async fn test_starts_tasks_in_input_order() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let started = started.clone();
                move || async move {
                    started.lock().push(i);
                    // later tasks finish first
                    tokio::time::sleep(Duration::from_millis(30 - i * 5)).await;
                    i
                }
            })
            .collect();

        let results = run(3, tasks).await;

        assert_eq!(*started.lock(), vec![0, 1, 2, 3, 4, 5]);
        let values: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    }

    fn explode() -> u32 {
        panic!("boom")
    }

    #[tokio::test]
    async fn test_panicking_task_is_isolated() {
        let tasks: Vec<Box<dyn FnOnce() -> futures::future::BoxFuture<'static, u32>>> = vec![
            Box::new(|| async { 1 }.boxed()),
            Box::new(|| async { explode() }.boxed()),
            Box::new(|| async { 3 }.boxed()),
        ];

        let results = run(1, tasks).await;

        assert_eq!(results[0], Ok(1));
        assert_eq!(results[1], Err(TaskPanicked("boom".to_string())));
        assert_eq!(results[2], Ok(3));
    }

    #[tokio::test]
    async fn test_panic_mid_flight_frees_its_slot() {
        let gauge = Arc::new(Gauge::default());
        let finished = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let gauge = gauge.clone();
                let finished = finished.clone();
                move || async move {
                    let _slot = gauge.slot();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    if i == 1 {
                        panic!("task {i} crashed");
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    finished.lock().push(i);
                    i
                }
            })
            .collect();

        let results = run(2, tasks).await;

        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        assert_eq!(gauge.active.load(Ordering::SeqCst), 0);
        let mut done = finished.lock().clone();
        done.sort_unstable();
        assert_eq!(done, vec![0, 2, 3]);
        assert!(matches!(&results[1], Err(TaskPanicked(message)) if message.contains("task 1 crashed")));
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[2], Ok(2));
        assert_eq!(results[3], Ok(3));
    }

    #[tokio::test]
    async fn test_zero_limit_and_empty_input() {
        let results = run(0, vec![|| async { 7 }]).await;
        assert_eq!(results, vec![Ok(7)]);

        let none: Vec<fn() -> std::future::Ready<()>> = Vec::new();
        assert!(run(4, none).await.is_empty());
    }
}
