//! Per-recipient buffering: enqueue, flush triggers and status

use crate::buffer::{ArmedTimer, RecipientBuffer};
use crate::config::{MAX_BUFFER_SIZE_LIMIT, MAX_DEBOUNCE};
use crate::error::{Error, Result, ValidationError};
use crate::types::{BufferStatus, EnqueueOptions, EnqueueOutcome, Event, FlushOutcome, RecipientId};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::Mutex;

use super::DeliveryCoordinator;

/// Enqueue parameters after defaults are applied and bounds checked
struct Triggers {
    debounce: Duration,
    max_buffer_size: usize,
}

impl DeliveryCoordinator {
    /// Buffer `text` for `recipient`
    ///
    /// The item is appended under the recipient's lock. The buffer is flushed
    /// right away when `force_send` is set or it reaches `max_buffer_size`
    /// items; otherwise a debounce timer is armed unless one is already
    /// pending. Overrides in `options` apply to this call only.
    ///
    /// A failed flush is reported in the outcome, not as an error; the items
    /// stay buffered.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyInput`] for empty or whitespace-only text
    /// - [`ValidationError::OutOfRange`] for `max_buffer_size` outside 1..=100
    ///   or `debounce_ms` above 600000
    /// - [`Error::ShuttingDown`] once shutdown has begun
    ///
    /// Validation happens before any buffer is created or touched.
    pub async fn enqueue(
        &self,
        recipient: &RecipientId,
        text: &str,
        options: EnqueueOptions,
    ) -> Result<EnqueueOutcome> {
        let triggers = self.resolve_triggers(text, &options)?;
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let buffer = self.buffer_for(recipient).await;
        let mut buf = buffer.lock().await;

        // Shutdown may have begun while this call waited for the lock; the
        // drain would then never see the item.
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let size = buf.push(text);
        tracing::debug!(recipient = %recipient, size, "message buffered");
        self.emit_event(Event::Buffered {
            recipient: recipient.to_string(),
            size,
        });

        if options.force_send || size >= triggers.max_buffer_size {
            tracing::debug!(
                recipient = %recipient,
                size,
                forced = options.force_send,
                "flushing on enqueue"
            );
            let flush = self.flush_locked(&mut buf).await;
            return Ok(EnqueueOutcome {
                buffered: buf.len(),
                flushed: flush.error.is_none() && flush.cleared_count > 0,
                consolidated_text: flush.consolidated_text,
                time_until_flush_ms: millis(buf.time_until_flush()),
                report: flush.report,
                error: flush.error,
            });
        }

        if let Some(timer) = buf.arm_timer(triggers.debounce) {
            self.schedule_timer(recipient.clone(), timer);
        }

        Ok(EnqueueOutcome {
            buffered: size,
            flushed: false,
            consolidated_text: None,
            time_until_flush_ms: millis(buf.time_until_flush()),
            report: None,
            error: None,
        })
    }

    /// Flush `recipient`'s buffer now, regardless of size or timer
    ///
    /// An empty or unknown buffer yields an outcome with `cleared_count == 0`.
    /// A pending debounce timer is not cancelled; when it fires it finds the
    /// batch already delivered and does nothing.
    pub async fn force_flush(&self, recipient: &RecipientId) -> FlushOutcome {
        let Some(buffer) = self.existing_buffer(recipient).await else {
            return FlushOutcome::default();
        };
        let mut buf = buffer.lock().await;
        self.flush_locked(&mut buf).await
    }

    /// Snapshot one recipient's buffer, or every buffer when `recipient` is `None`
    ///
    /// Each snapshot is taken under that buffer's lock. An unknown recipient
    /// yields an empty snapshot. Results are ordered by recipient.
    pub async fn status(&self, recipient: Option<&RecipientId>) -> Vec<BufferStatus> {
        if let Some(recipient) = recipient {
            let status = match self.existing_buffer(recipient).await {
                Some(buffer) => buffer.lock().await.status(),
                None => RecipientBuffer::new(recipient.clone()).status(),
            };
            return vec![status];
        }

        let mut buffers: Vec<(RecipientId, Arc<Mutex<RecipientBuffer>>)> = {
            let map = self.buffers.lock().await;
            map.iter()
                .map(|(id, buffer)| (id.clone(), Arc::clone(buffer)))
                .collect()
        };
        buffers.sort_by(|a, b| a.0.cmp(&b.0));

        let mut statuses = Vec::with_capacity(buffers.len());
        for (_, buffer) in buffers {
            statuses.push(buffer.lock().await.status());
        }
        statuses
    }

    /// Consolidate, plan, and dispatch through the gate
    ///
    /// The caller holds the recipient lock for the whole call, so flushes for
    /// one recipient never overlap. Items are cleared only when every attempted
    /// send succeeded.
    pub(crate) async fn flush_locked(&self, buf: &mut RecipientBuffer) -> FlushOutcome {
        let Some(text) = buf.consolidated_text() else {
            return FlushOutcome::default();
        };
        let item_count = buf.len();
        let recipient = buf.recipient().clone();
        let chunks = self.planner.plan(&text);

        let dispatcher = Arc::clone(&self.dispatcher);
        let job_recipient = recipient.clone();
        let job_text = self.planner.unchunked_text(&text);
        let dispatched = self
            .gate
            .run(async move {
                dispatcher
                    .deliver(&job_recipient, &chunks, &job_text)
                    .await
            })
            .await;

        match dispatched {
            Ok(report) if report.is_success() => {
                let cleared = buf.complete_flush();
                tracing::info!(
                    recipient = %recipient,
                    item_count = cleared,
                    chunk_count = report.attempted,
                    used_fallback = report.used_fallback,
                    "buffer flushed"
                );
                self.emit_event(Event::Flushed {
                    recipient: recipient.to_string(),
                    item_count: cleared,
                    chunk_count: report.attempted,
                });
                FlushOutcome {
                    cleared_count: cleared,
                    retained_count: 0,
                    consolidated_text: Some(text),
                    report: Some(report),
                    error: None,
                }
            }
            Ok(report) => {
                let error = report
                    .first_error()
                    .unwrap_or("no message was accepted")
                    .to_string();
                tracing::warn!(
                    recipient = %recipient,
                    item_count,
                    successful = report.successful,
                    failed = report.failed,
                    error = %error,
                    "flush failed, items stay buffered"
                );
                self.flush_failed(&recipient, item_count, text, Some(report), error)
            }
            Err(e) => {
                let error = Error::from(e).to_string();
                tracing::error!(
                    recipient = %recipient,
                    item_count,
                    error = %error,
                    "dispatch failed unexpectedly, items stay buffered"
                );
                self.flush_failed(&recipient, item_count, text, None, error)
            }
        }
    }

    fn flush_failed(
        &self,
        recipient: &RecipientId,
        item_count: usize,
        text: String,
        report: Option<crate::types::DeliveryReport>,
        error: String,
    ) -> FlushOutcome {
        self.emit_event(Event::FlushFailed {
            recipient: recipient.to_string(),
            item_count,
            error: error.clone(),
        });
        FlushOutcome {
            cleared_count: 0,
            retained_count: item_count,
            consolidated_text: Some(text),
            report,
            error: Some(error),
        }
    }

    fn resolve_triggers(&self, text: &str, options: &EnqueueOptions) -> Result<Triggers> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }

        let max_buffer_size = options
            .max_buffer_size
            .unwrap_or(self.config.buffer.max_buffer_size);
        if !(1..=MAX_BUFFER_SIZE_LIMIT).contains(&max_buffer_size) {
            return Err(ValidationError::OutOfRange {
                field: "max_buffer_size",
                value: max_buffer_size as u64,
                min: 1,
                max: MAX_BUFFER_SIZE_LIMIT as u64,
            }
            .into());
        }

        let debounce = match options.debounce_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.config.buffer.consolidate_after,
        };
        if debounce > MAX_DEBOUNCE {
            return Err(ValidationError::OutOfRange {
                field: "debounce_ms",
                value: debounce.as_millis() as u64,
                min: 0,
                max: MAX_DEBOUNCE.as_millis() as u64,
            }
            .into());
        }

        Ok(Triggers {
            debounce,
            max_buffer_size,
        })
    }

    async fn buffer_for(&self, recipient: &RecipientId) -> Arc<Mutex<RecipientBuffer>> {
        let mut map = self.buffers.lock().await;
        Arc::clone(
            map.entry(recipient.clone())
                .or_insert_with(|| Arc::new(Mutex::new(RecipientBuffer::new(recipient.clone())))),
        )
    }

    async fn existing_buffer(&self, recipient: &RecipientId) -> Option<Arc<Mutex<RecipientBuffer>>> {
        self.buffers.lock().await.get(recipient).map(Arc::clone)
    }

    /// Start a debounce timer on the gate's runtime
    ///
    /// The timer outlives the caller's runtime, which matters for callers that
    /// bridge in from a thread with a short-lived runtime.
    fn schedule_timer(&self, recipient: RecipientId, timer: ArmedTimer) {
        tracing::debug!(
            recipient = %recipient,
            epoch = timer.epoch,
            wait_ms = timer.wait.as_millis() as u64,
            "debounce timer armed"
        );

        let coordinator = self.clone();
        let cancelled = self.timers.clone();
        self.gate.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    tracing::debug!(recipient = %recipient, "debounce timer cancelled");
                }
                _ = tokio::time::sleep(timer.wait) => {
                    coordinator.on_timer(&recipient, timer.epoch).await;
                }
            }
        });
    }

    async fn on_timer(&self, recipient: &RecipientId, epoch: u64) {
        let Some(buffer) = self.existing_buffer(recipient).await else {
            return;
        };
        let mut buf = buffer.lock().await;

        if !buf.timer_fired(epoch) {
            tracing::debug!(
                recipient = %recipient,
                epoch,
                current_epoch = buf.epoch(),
                "stale debounce timer ignored"
            );
            return;
        }

        tracing::debug!(recipient = %recipient, epoch, "debounce timer fired");
        self.flush_locked(&mut buf).await;
    }
}

fn millis(duration: Option<Duration>) -> u64 {
    duration.map_or(0, |d| d.as_millis() as u64)
}
