//! Sequential chunk delivery with pacing
//!
//! The dispatcher is only ever driven from inside the delivery gate, so at most
//! one `deliver` runs at a time and chunk sends never interleave across
//! recipients.

use crate::channel::ChannelClient;
use crate::error::TransportError;
use crate::types::{Chunk, ChunkResult, DeliveryReport, Event, RecipientId};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Sends a chunk list through a [`ChannelClient`], pausing between chunks
pub struct Dispatcher {
    client: Arc<dyn ChannelClient>,
    events: Option<broadcast::Sender<Event>>,
}

impl Dispatcher {
    /// Create a dispatcher that reports nothing beyond its return value
    pub fn new(client: Arc<dyn ChannelClient>) -> Self {
        Self {
            client,
            events: None,
        }
    }

    /// Create a dispatcher that also emits per-chunk events
    pub fn with_events(client: Arc<dyn ChannelClient>, events: broadcast::Sender<Event>) -> Self {
        Self {
            client,
            events: Some(events),
        }
    }

    /// The channel client sends go through
    pub fn client(&self) -> &Arc<dyn ChannelClient> {
        &self.client
    }

    /// Deliver `chunks` to `recipient` in index order
    ///
    /// After each chunk except the last, sleeps for that chunk's delay. A failed
    /// chunk is recorded and delivery continues with the next one.
    ///
    /// `original_text` is sent once, unchunked, instead of the chunks when:
    /// - `chunks` is empty (chunking failed upstream), or
    /// - the first send fails with a systemic error (see
    ///   [`TransportError::is_systemic`])
    ///
    /// In the second case the failed first attempt is logged but left out of
    /// the report, which then describes only the fallback send.
    pub async fn deliver(
        &self,
        recipient: &RecipientId,
        chunks: &[Chunk],
        original_text: &str,
    ) -> DeliveryReport {
        if chunks.is_empty() {
            tracing::warn!(recipient = %recipient, "no chunks planned, sending unchunked");
            return self.send_fallback(recipient, original_text).await;
        }

        let mut report = DeliveryReport::default();
        let last = chunks.len() - 1;

        for (position, chunk) in chunks.iter().enumerate() {
            match self.client.send(recipient, &chunk.text).await {
                Ok(receipt) => {
                    tracing::debug!(
                        recipient = %recipient,
                        chunk_index = chunk.index,
                        message_id = ?receipt.message_id,
                        "chunk sent"
                    );
                    self.emit(Event::ChunkSent {
                        recipient: recipient.to_string(),
                        index: chunk.index,
                        message_id: receipt.message_id.clone(),
                    });
                    report.record(ChunkResult {
                        index: chunk.index,
                        success: true,
                        message_id: receipt.message_id,
                        error: None,
                    });
                }
                Err(e) if position == 0 && e.is_systemic() => {
                    tracing::warn!(
                        recipient = %recipient,
                        client = self.client.name(),
                        error = %e,
                        "first chunk failed, falling back to unchunked send"
                    );
                    return self.send_fallback(recipient, original_text).await;
                }
                Err(e) => {
                    self.record_failure(&mut report, recipient, chunk.index, &e);
                }
            }

            if position < last && !chunk.delay.is_zero() {
                tokio::time::sleep(chunk.delay).await;
            }
        }

        report
    }

    async fn send_fallback(&self, recipient: &RecipientId, text: &str) -> DeliveryReport {
        let mut report = DeliveryReport {
            used_fallback: true,
            ..Default::default()
        };

        if text.trim().is_empty() {
            report.record(ChunkResult {
                index: 0,
                success: false,
                message_id: None,
                error: Some("nothing to send".to_string()),
            });
            return report;
        }

        match self.client.send(recipient, text).await {
            Ok(receipt) => {
                self.emit(Event::ChunkSent {
                    recipient: recipient.to_string(),
                    index: 0,
                    message_id: receipt.message_id.clone(),
                });
                report.record(ChunkResult {
                    index: 0,
                    success: true,
                    message_id: receipt.message_id,
                    error: None,
                });
            }
            Err(e) => self.record_failure(&mut report, recipient, 0, &e),
        }
        report
    }

    fn record_failure(
        &self,
        report: &mut DeliveryReport,
        recipient: &RecipientId,
        index: usize,
        error: &TransportError,
    ) {
        tracing::warn!(
            recipient = %recipient,
            chunk_index = index,
            error = %error,
            "chunk send failed"
        );
        self.emit(Event::ChunkFailed {
            recipient: recipient.to_string(),
            index,
            error: error.to_string(),
        });
        report.record(ChunkResult {
            index,
            success: false,
            message_id: None,
            error: Some(error.to_string()),
        });
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }
}
