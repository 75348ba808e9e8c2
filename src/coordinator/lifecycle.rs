//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::DeliveryCoordinator;

/// What a shutdown drain achieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Buffers that were delivered and cleared
    pub flushed_buffers: usize,
    /// Items delivered during the drain
    pub delivered_items: usize,
    /// Items left buffered because their flush failed
    pub retained_items: usize,
}

impl DeliveryCoordinator {
    /// Gracefully shut down the coordinator
    ///
    /// 1. Stops accepting new messages ([`Error::ShuttingDown`](crate::Error::ShuttingDown))
    /// 2. Cancels every pending debounce timer
    /// 3. Force-flushes every non-empty buffer, one recipient at a time
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Items whose flush fails stay buffered and are counted in the summary;
    /// nothing is persisted. Calling `shutdown` again drains whatever remains.
    pub async fn shutdown(&self) -> Result<DrainSummary> {
        tracing::info!("initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        self.timers.cancel();
        tracing::debug!("stopped accepting messages and cancelled debounce timers");

        let summary = self.drain().await;
        if summary.retained_items > 0 {
            tracing::warn!(
                retained_items = summary.retained_items,
                "some buffered messages could not be delivered before shutdown"
            );
        }

        self.emit_event(Event::Shutdown);
        tracing::info!(
            flushed_buffers = summary.flushed_buffers,
            delivered_items = summary.delivered_items,
            "shutdown complete"
        );
        Ok(summary)
    }

    /// Whether new messages are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    async fn drain(&self) -> DrainSummary {
        let buffers: Vec<_> = {
            let map = self.buffers.lock().await;
            map.values().map(Arc::clone).collect()
        };

        let mut summary = DrainSummary::default();
        for buffer in buffers {
            let mut buf = buffer.lock().await;
            if buf.is_empty() {
                continue;
            }
            let outcome = self.flush_locked(&mut buf).await;
            if outcome.cleared_count > 0 {
                summary.flushed_buffers += 1;
                summary.delivered_items += outcome.cleared_count;
            }
            summary.retained_items += outcome.retained_count;
        }
        summary
    }
}
