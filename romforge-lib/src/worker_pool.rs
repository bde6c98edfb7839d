//! Worker pool for concurrent processing with backpressure.
//!
//! Spawns N persistent tokio tasks that pull work items from a bounded
//! async-channel. Results are sent to an unbounded channel for consumption
//! by the caller.
//!
//! Uses `async-channel` for work distribution: its `Receiver` is `Clone`,
//! so each worker gets its own handle with no `Mutex` needed.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cooperative cancellation flag shared between a caller and a running pool.
///
/// Cancelling stops the submitter from dispatching further items; workers
/// drop any item they pull afterwards. Items already being processed run to
/// completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A pool of worker tasks that process items concurrently.
///
/// Workers are spawned as persistent tokio tasks that pull from a bounded
/// work channel. This provides:
/// - Natural backpressure when all workers are busy
/// - Clean shutdown by dropping the work sender
/// - Single concurrency control point (worker count)
///
/// # Example
///
/// ```ignore
/// let mut pool = WorkerPool::start(4, items, CancelToken::new(), |item| async move {
///     process(item).await
/// });
///
/// while let Some(result) = pool.recv().await {
///     handle(result);
/// }
/// ```
pub struct WorkerPool<R: Send + 'static> {
    result_rx: mpsc::UnboundedReceiver<R>,
    _handles: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Spawn N workers, submit all items, and return a pool for receiving results.
    ///
    /// Must be called from within a tokio runtime. `n` is clamped to at least 1.
    /// Results arrive in completion order, not submission order.
    pub fn start<W, F, Fut>(n: usize, items: Vec<W>, cancel: CancelToken, process_fn: F) -> Self
    where
        W: Send + 'static,
        F: Fn(W) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let n = n.max(1);
        let (work_tx, work_rx) = async_channel::bounded::<W>(n);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<R>();
        let process_fn = Arc::new(process_fn);

        let handles: Vec<JoinHandle<()>> = (0..n)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let process_fn = process_fn.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    while let Ok(item) = work_rx.recv().await {
                        if cancel.is_cancelled() {
                            continue;
                        }
                        if result_tx.send(process_fn(item).await).is_err() {
                            break; // Receiver dropped
                        }
                    }
                })
            })
            .collect();

        // Drop our copy of result_tx so the channel closes when all workers finish
        drop(result_tx);

        tokio::spawn(async move {
            for item in items {
                if cancel.is_cancelled() {
                    log::debug!("Worker pool: cancelled, no further items dispatched");
                    break;
                }
                if work_tx.send(item).await.is_err() {
                    break;
                }
            }
            // work_tx dropped here -> channel closes -> workers drain remaining items then stop
        });

        Self {
            result_rx,
            _handles: handles,
        }
    }

    /// Receive the next result. Returns `None` when all items have been
    /// processed and all workers have shut down.
    pub async fn recv(&mut self) -> Option<R> {
        self.result_rx.recv().await
    }
}
