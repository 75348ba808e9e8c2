//! Process-wide serialization of dispatch
//!
//! The gate is a single-consumer actor. One dedicated OS thread runs its own
//! current-thread Tokio runtime and pulls jobs off an unbounded queue, awaiting
//! each to completion before taking the next. Any caller that can reach the
//! queue shares the same mutual exclusion: tasks on the caller's runtime, tasks
//! on a runtime some thread created a moment ago, or plain threads with no
//! runtime at all.
//!
//! Jobs run in the order they reach the queue. Callers that race to submit are
//! not ordered against each other.

use crate::error::ConcurrencyError;
use crate::types::GateStats;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::runtime::{Builder, Handle};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

const WORKER_THREAD_NAME: &str = "delivery-gate";

#[derive(Default)]
struct Counters {
    waiting: AtomicUsize,
    in_flight: AtomicBool,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Admits one dispatch at a time, process-wide
///
/// Dropping the last handle closes the queue; the worker finishes the job it is
/// running and exits, cancelling any tasks started with [`spawn`](Self::spawn).
pub struct DeliveryGate {
    jobs: mpsc::UnboundedSender<Job>,
    worker: Handle,
    counters: Arc<Counters>,
}

impl DeliveryGate {
    /// Start the worker thread and its runtime
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::WorkerStart`] if the runtime or thread cannot
    /// be created.
    pub fn start() -> Result<Self, ConcurrencyError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConcurrencyError::WorkerStart(e.to_string()))?;
        let worker = runtime.handle().clone();
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(job) = queue.recv().await {
                        job.await;
                    }
                });
                tracing::debug!("delivery gate worker stopped");
            })
            .map_err(|e| ConcurrencyError::WorkerStart(e.to_string()))?;

        tracing::debug!(thread = WORKER_THREAD_NAME, "delivery gate worker started");

        Ok(Self {
            jobs,
            worker,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Run `job` inside the gate and await its output
    ///
    /// Usable from any async runtime, including one created just for this call.
    ///
    /// # Errors
    ///
    /// - [`ConcurrencyError::JobPanicked`] if the job panicked (the gate keeps running)
    /// - [`ConcurrencyError::GateClosed`] if the worker is gone
    pub async fn run<F, T>(&self, job: F) -> Result<T, ConcurrencyError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let reply = self.submit(job)?;
        reply.await.map_err(|_| ConcurrencyError::GateClosed)?
    }

    /// Run `job` inside the gate, blocking the calling thread until it finishes
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::BlockingInAsyncContext`] when called from a
    /// thread that is driving an async runtime, otherwise as [`run`](Self::run).
    pub fn run_blocking<F, T>(&self, job: F) -> Result<T, ConcurrencyError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if Handle::try_current().is_ok() {
            return Err(ConcurrencyError::BlockingInAsyncContext);
        }
        let reply = self.submit(job)?;
        reply
            .blocking_recv()
            .map_err(|_| ConcurrencyError::GateClosed)?
    }

    /// Run a background task on the worker runtime, outside the gate
    ///
    /// The task is not serialized with jobs. It lives as long as the gate,
    /// independent of the runtime the caller happens to be on.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.worker.spawn(task)
    }

    /// Current occupancy
    pub fn stats(&self) -> GateStats {
        GateStats {
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
            waiting: self.counters.waiting.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Whether the worker is still consuming jobs
    pub fn is_running(&self) -> bool {
        !self.jobs.is_closed()
    }

    fn submit<F, T>(
        &self,
        job: F,
    ) -> Result<oneshot::Receiver<Result<T, ConcurrencyError>>, ConcurrencyError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let counters = Arc::clone(&self.counters);
        counters.waiting.fetch_add(1, Ordering::SeqCst);

        let wrapped: Job = Box::pin(async move {
            counters.waiting.fetch_sub(1, Ordering::SeqCst);
            counters.in_flight.store(true, Ordering::SeqCst);

            let outcome = AssertUnwindSafe(job).catch_unwind().await;

            counters.in_flight.store(false, Ordering::SeqCst);
            let result = match outcome {
                Ok(value) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                    Ok(value)
                }
                Err(payload) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    let message = panic_message(payload.as_ref());
                    tracing::error!(panic = %message, "dispatch job panicked inside the gate");
                    Err(ConcurrencyError::JobPanicked(message))
                }
            };

            // Caller may have given up waiting
            let _ = reply_tx.send(result);
        });

        if self.jobs.send(wrapped).is_err() {
            self.counters.waiting.fetch_sub(1, Ordering::SeqCst);
            return Err(ConcurrencyError::GateClosed);
        }
        Ok(reply_rx)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
