//! Unbuffered delivery, splitting, diagnostics and thread bridges

use crate::chunking::ChunkSplitter;
use crate::error::{ConcurrencyError, Error, Result, ValidationError};
use crate::types::{
    DeliveryReport, EnqueueOptions, EnqueueOutcome, FlushOutcome, GateStats, RecipientId,
    SplitOptions, SplitResult,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::runtime::{Builder, Handle};

use super::DeliveryCoordinator;

impl DeliveryCoordinator {
    /// Split `text` without sending it
    ///
    /// Uses the configured chunking options unless `options` is given.
    ///
    /// # Errors
    ///
    /// See [`ChunkSplitter::split_with`].
    pub fn split(&self, text: &str, options: Option<&SplitOptions>) -> Result<SplitResult> {
        let options = options.unwrap_or_else(|| self.planner.splitter().defaults());
        ChunkSplitter::split_with(text, options)
    }

    /// Chunk `text` and dispatch it through the gate, bypassing the buffer
    ///
    /// Anything already buffered for `recipient` is left alone and may be
    /// delivered before or after this text.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyInput`] for empty or whitespace-only text
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::Concurrency`] if the dispatch job panicked
    pub async fn deliver_now(&self, recipient: &RecipientId, text: &str) -> Result<DeliveryReport> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let chunks = self.planner.plan(text);
        let dispatcher = Arc::clone(&self.dispatcher);
        let job_recipient = recipient.clone();
        let job_text = self.planner.unchunked_text(text);

        let report = self
            .gate
            .run(async move {
                dispatcher
                    .deliver(&job_recipient, &chunks, &job_text)
                    .await
            })
            .await?;

        tracing::info!(
            recipient = %recipient,
            chunk_count = report.attempted,
            successful = report.successful,
            used_fallback = report.used_fallback,
            "direct delivery finished"
        );
        Ok(report)
    }

    /// Occupancy of the delivery gate
    pub fn gate_stats(&self) -> GateStats {
        self.gate.stats()
    }

    /// [`enqueue`](Self::enqueue) from a thread that is not running an async runtime
    ///
    /// Builds a single-use runtime for the call. Debounce timers armed by the
    /// call keep running after it returns.
    ///
    /// # Errors
    ///
    /// As [`enqueue`](Self::enqueue), plus
    /// [`ConcurrencyError::BlockingInAsyncContext`] when called from async code.
    pub fn enqueue_blocking(
        &self,
        recipient: &RecipientId,
        text: &str,
        options: EnqueueOptions,
    ) -> Result<EnqueueOutcome> {
        block_on_fresh_runtime(self.enqueue(recipient, text, options))?
    }

    /// [`force_flush`](Self::force_flush) from a thread that is not running an async runtime
    ///
    /// # Errors
    ///
    /// [`ConcurrencyError::BlockingInAsyncContext`] when called from async code,
    /// or an I/O error if the runtime cannot be built.
    pub fn force_flush_blocking(&self, recipient: &RecipientId) -> Result<FlushOutcome> {
        block_on_fresh_runtime(self.force_flush(recipient))
    }
}

fn block_on_fresh_runtime<F: Future>(future: F) -> Result<F::Output> {
    if Handle::try_current().is_ok() {
        return Err(ConcurrencyError::BlockingInAsyncContext.into());
    }
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}
